//! Site controllers.
//!
//! Each function builds a fresh [`Controller`]; the router instantiates them
//! lazily the first time one of their actions is dispatched.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use mivra_router::{Controller, PathParams, Request, Response};
use regex::Regex;
use serde_json::json;

use crate::views;

static EMAIL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^[A-Za-z0-9.!#$%&'*+/=?^_`{|}~-]+@[A-Za-z0-9](?:[A-Za-z0-9-]*[A-Za-z0-9])?(?:\.[A-Za-z0-9](?:[A-Za-z0-9-]*[A-Za-z0-9])?)*$",
    )
    .expect("email regex is valid")
});

/// A check applied to one trimmed form field.
#[derive(Debug, Clone, Copy)]
enum Rule {
    Required,
    Email,
    Min(usize),
    Max(usize),
}

impl Rule {
    /// Returns the error message when `value` breaks the rule.
    ///
    /// Only `Required` looks at empty values.
    fn check(self, value: &str) -> Option<String> {
        let len = value.chars().count();
        match self {
            Self::Required if value.is_empty() => Some("This field is required.".to_string()),
            _ if value.is_empty() => None,
            Self::Email if !EMAIL.is_match(value) => Some("Invalid email.".to_string()),
            Self::Min(n) if len < n => Some(format!("Min {n} characters.")),
            Self::Max(n) if len > n => Some(format!("Max {n} characters.")),
            _ => None,
        }
    }
}

/// Rules for the contact form, per field.
const CONTACT_RULES: [(&str, &[Rule]); 3] = [
    ("name", &[Rule::Required, Rule::Min(2), Rule::Max(80)]),
    ("email", &[Rule::Required, Rule::Email, Rule::Max(200)]),
    ("message", &[Rule::Required, Rule::Min(5), Rule::Max(2000)]),
];

/// `HomeController`: the landing page.
pub fn home(contact_url: String) -> Controller {
    Controller::new().action("index", move |_req: &Request, _params: &PathParams| {
        Response::html(views::home(&contact_url))
    })
}

/// `ContactController`: the contact page and its form submission.
pub fn contact(submit_url: String) -> Controller {
    Controller::new()
        .action("show", move |_req: &Request, _params: &PathParams| {
            Response::html(views::contact(&submit_url))
        })
        .action("submit", submit)
}

/// Answers a contact form post with JSON.
///
/// `{"ok":true}` when the form body passes every rule, otherwise a 422
/// carrying one message per offending field.
pub fn submit(req: &Request, _params: &PathParams) -> Response {
    let errors = contact_errors(req);
    if errors.is_empty() {
        Response::json(&json!({ "ok": true }))
    } else {
        Response::json(&json!({ "ok": false, "errors": errors })).status(422)
    }
}

/// Validates the form body. When several rules fail for one field, the
/// last one's message is reported.
fn contact_errors(req: &Request) -> BTreeMap<&'static str, String> {
    let mut errors = BTreeMap::new();

    for (field, rules) in CONTACT_RULES {
        let value = req.form.get(field).map_or("", |v| v.trim());
        for rule in rules {
            if let Some(message) = rule.check(value) {
                errors.insert(field, message);
            }
        }
    }

    errors
}
