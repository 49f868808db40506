//! Element tree representation inside the sandbox.
//!
//! Elements are plain JavaScript objects carrying a marker property, a type
//! (tag name string, fragment marker, or a component function), a props
//! object, and a children array. The host builds them through native
//! `createElement`/`jsx` functions and walks them back out when mounting.

use boa_engine::object::builtins::JsArray;
use boa_engine::object::ObjectInitializer;
use boa_engine::property::Attribute;
use boa_engine::{js_string, Context, JsArgs, JsNativeError, JsObject, JsResult, JsValue};

/// Marker value identifying host-created elements.
pub(crate) const ELEMENT_MARKER: &str = "vitrine.element";

/// Type value identifying fragments (render children only).
pub(crate) const FRAGMENT_TYPE: &str = "vitrine.fragment";

/// Native `createElement(type, props, ...children)`.
pub(crate) fn create_element(
    _this: &JsValue,
    args: &[JsValue],
    context: &mut Context,
) -> JsResult<JsValue> {
    let element_type = args.get_or_undefined(0).clone();
    if element_type.is_null_or_undefined() {
        return Err(JsNativeError::typ()
            .with_message("element type is null or undefined")
            .into());
    }

    let props = args.get_or_undefined(1).clone();
    let children: Vec<JsValue> = args.iter().skip(2).cloned().collect();

    Ok(new_element(element_type, props, children, context).into())
}

/// Native `jsx(type, props)` / `jsxs(type, props)` (automatic-runtime
/// surface). Children stay inside `props.children`; the renderer reads them
/// from there.
pub(crate) fn jsx(_this: &JsValue, args: &[JsValue], context: &mut Context) -> JsResult<JsValue> {
    let element_type = args.get_or_undefined(0).clone();
    if element_type.is_null_or_undefined() {
        return Err(JsNativeError::typ()
            .with_message("element type is null or undefined")
            .into());
    }

    let props = args.get_or_undefined(1).clone();

    Ok(new_element(element_type, props, Vec::new(), context).into())
}

/// Native `isValidElement(value)`.
pub(crate) fn is_valid_element(
    _this: &JsValue,
    args: &[JsValue],
    context: &mut Context,
) -> JsResult<JsValue> {
    Ok(JsValue::from(is_element(
        args.get_or_undefined(0),
        context,
    )))
}

/// Build a marked element object.
pub(crate) fn new_element(
    element_type: JsValue,
    props: JsValue,
    children: Vec<JsValue>,
    context: &mut Context,
) -> JsObject {
    let children_array: JsValue = JsArray::from_iter(children, context).into();

    ObjectInitializer::new(context)
        .property(
            js_string!("$$vitrine"),
            js_string!("vitrine.element"),
            Attribute::all(),
        )
        .property(js_string!("type"), element_type, Attribute::all())
        .property(js_string!("props"), props, Attribute::all())
        .property(js_string!("children"), children_array, Attribute::all())
        .build()
}

/// Host-side check for the element marker.
pub(crate) fn is_element(value: &JsValue, context: &mut Context) -> bool {
    let Some(object) = value.as_object() else {
        return false;
    };
    let Ok(marker) = object.get(js_string!("$$vitrine"), context) else {
        return false;
    };
    marker
        .as_string()
        .map(|s| s.to_std_string_escaped() == ELEMENT_MARKER)
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn marks_created_elements() {
        let mut context = Context::default();
        let element = new_element(
            JsValue::from(js_string!("div")),
            JsValue::null(),
            vec![JsValue::from(js_string!("hello"))],
            &mut context,
        );

        assert!(is_element(&element.clone().into(), &mut context));

        let element_type = element.get(js_string!("type"), &mut context).unwrap();
        assert_eq!(
            element_type.as_string().unwrap().to_std_string_escaped(),
            "div"
        );
    }

    #[test]
    fn rejects_unmarked_values() {
        let mut context = Context::default();

        assert!(!is_element(&JsValue::from(3), &mut context));
        assert!(!is_element(&JsValue::null(), &mut context));

        let plain = ObjectInitializer::new(&mut context).build();
        assert!(!is_element(&plain.into(), &mut context));
    }
}
