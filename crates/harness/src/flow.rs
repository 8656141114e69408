//! The discount verification flow
//!
//! Sign in, open the quote's edit page, switch the discount to a
//! percentage, save, and capture the result. The sequence is fixed; only
//! the values it types are configurable.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::step::Step;

const EMAIL_INPUT: &str = "input[name=\"email\"]";
const PASSWORD_INPUT: &str = "input[name=\"password\"]";
const DISCOUNT_TYPE_SELECT: &str = "select[name=\"discount_type\"]";
const DISCOUNT_VALUE_INPUT: &str = "input[name=\"discount_value\"]";

/// Parameters of the login and discount-edit flow. Defaults are the
/// values the verification has always used against the local dev
/// instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FlowConfig {
    /// Login page path.
    pub login_path: String,

    /// Account the flow signs in as.
    pub email: String,
    pub password: String,
    /// Accessible name of the login submit button.
    pub login_button: String,

    /// Company and quote whose edit page is exercised.
    pub company_id: String,
    pub quote_id: String,

    /// Discount applied on the finance form.
    pub discount_type: String,
    pub discount_value: String,
    /// Accessible name of the save button.
    pub save_button: String,

    /// Where the verification screenshot is written.
    pub screenshot: PathBuf,
    pub full_page: bool,

    /// Timeout for the two selector waits, in milliseconds.
    pub wait_timeout_ms: u64,
}

impl Default for FlowConfig {
    fn default() -> Self {
        Self {
            login_path: "/login".to_string(),
            email: "clevertonruppenthal1@gmail.com".to_string(),
            password: "123456".to_string(),
            login_button: "Entrar".to_string(),
            company_id: "f28afd2f-0a27-4fd8-871b-93121cf1d828".to_string(),
            quote_id: "5aeaa02f-a039-487c-9876-77ced0ba0e45".to_string(),
            discount_type: "percentage".to_string(),
            discount_value: "10".to_string(),
            save_button: "Salvar".to_string(),
            screenshot: PathBuf::from("verification.png"),
            full_page: false,
            wait_timeout_ms: 30_000,
        }
    }
}

impl FlowConfig {
    /// Edit page for the configured quote.
    pub fn quote_edit_path(&self) -> String {
        format!(
            "/companies/{}/quotes/{}/edit",
            self.company_id, self.quote_id
        )
    }

    /// The whole flow, in order. Waiting on a form control before
    /// touching the page keeps the client-side-rendered forms from
    /// racing the script.
    pub fn steps(&self) -> Vec<Step> {
        vec![
            Step::Navigate {
                url: self.login_path.clone(),
            },
            Step::WaitFor {
                selector: EMAIL_INPUT.to_string(),
                timeout_ms: self.wait_timeout_ms,
            },
            Step::Fill {
                selector: EMAIL_INPUT.to_string(),
                value: self.email.clone(),
            },
            Step::Fill {
                selector: PASSWORD_INPUT.to_string(),
                value: self.password.clone(),
            },
            Step::ClickButton {
                label: self.login_button.clone(),
            },
            Step::Navigate {
                url: self.quote_edit_path(),
            },
            Step::WaitFor {
                selector: DISCOUNT_TYPE_SELECT.to_string(),
                timeout_ms: self.wait_timeout_ms,
            },
            Step::Select {
                selector: DISCOUNT_TYPE_SELECT.to_string(),
                value: self.discount_type.clone(),
            },
            Step::Fill {
                selector: DISCOUNT_VALUE_INPUT.to_string(),
                value: self.discount_value.clone(),
            },
            Step::ClickButton {
                label: self.save_button.clone(),
            },
            Step::Screenshot {
                path: self.screenshot.clone(),
                full_page: self.full_page,
            },
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_flow_matches_the_recorded_sequence() {
        let labels: Vec<String> = FlowConfig::default()
            .steps()
            .iter()
            .map(Step::label)
            .collect();

        assert_eq!(
            labels,
            vec![
                "navigate:/login",
                "wait:input[name=\"email\"]",
                "fill:input[name=\"email\"]",
                "fill:input[name=\"password\"]",
                "click:Entrar",
                "navigate:/companies/f28afd2f-0a27-4fd8-871b-93121cf1d828\
                 /quotes/5aeaa02f-a039-487c-9876-77ced0ba0e45/edit",
                "wait:select[name=\"discount_type\"]",
                "select:select[name=\"discount_type\"]",
                "fill:input[name=\"discount_value\"]",
                "click:Salvar",
                "screenshot:verification.png",
            ]
        );
    }

    #[test]
    fn quote_edit_path_combines_company_and_quote() {
        let config = FlowConfig {
            company_id: "c1".to_string(),
            quote_id: "q2".to_string(),
            ..Default::default()
        };
        assert_eq!(config.quote_edit_path(), "/companies/c1/quotes/q2/edit");
    }

    #[test]
    fn credentials_and_discount_reach_the_right_fields() {
        let config = FlowConfig {
            email: "someone@example.com".to_string(),
            password: "hunter2".to_string(),
            discount_value: "25".to_string(),
            ..Default::default()
        };

        let fills: Vec<(String, String)> = config
            .steps()
            .into_iter()
            .filter_map(|step| match step {
                Step::Fill { selector, value } => Some((selector, value)),
                _ => None,
            })
            .collect();

        assert_eq!(
            fills,
            vec![
                (EMAIL_INPUT.to_string(), "someone@example.com".to_string()),
                (PASSWORD_INPUT.to_string(), "hunter2".to_string()),
                (DISCOUNT_VALUE_INPUT.to_string(), "25".to_string()),
            ]
        );
    }

    #[test]
    fn screenshot_is_the_final_step() {
        let steps = FlowConfig::default().steps();
        assert!(matches!(steps.last(), Some(Step::Screenshot { .. })));

        let captures = steps
            .iter()
            .filter(|s| matches!(s, Step::Screenshot { .. }))
            .count();
        assert_eq!(captures, 1);
    }
}
