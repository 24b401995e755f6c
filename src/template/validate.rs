//! Load-time check that templates only call known functions
//!
//! Handlebars only notices an unknown helper when it is reached during a
//! render. Walking the compiled template lets `load` reject it up front.

use std::collections::HashSet;

use handlebars::template::{HelperTemplate, Parameter, Template, TemplateElement};

/// Return the first function called by `template` that is not in `known`
pub fn find_unknown_function(template: &Template, known: &HashSet<&str>) -> Option<String> {
    template
        .elements
        .iter()
        .find_map(|element| check_element(element, known, false))
}

fn check_element(element: &TemplateElement, known: &HashSet<&str>, subexpression: bool) -> Option<String> {
    match element {
        TemplateElement::Expression(helper) | TemplateElement::HtmlExpression(helper) => {
            check_helper(helper, known, subexpression)
        }
        TemplateElement::HelperBlock(helper) => check_helper(helper, known, true),
        _ => None,
    }
}

fn check_helper(helper: &HelperTemplate, known: &HashSet<&str>, is_call: bool) -> Option<String> {
    // `{{name}}` without arguments is a variable lookup, not a call
    let is_call = is_call || !helper.params.is_empty() || !helper.hash.is_empty();
    if is_call {
        if let Some(name) = helper.name.as_name() {
            if !known.contains(name) {
                return Some(name.to_string());
            }
        }
    }

    helper
        .params
        .iter()
        .chain(helper.hash.values())
        .find_map(|param| check_parameter(param, known))
        .or_else(|| helper.template.as_ref().and_then(|t| find_unknown_function(t, known)))
        .or_else(|| helper.inverse.as_ref().and_then(|t| find_unknown_function(t, known)))
}

fn check_parameter(param: &Parameter, known: &HashSet<&str>) -> Option<String> {
    match param {
        Parameter::Subexpression(sub) => check_element(&sub.element, known, true),
        _ => None,
    }
}
