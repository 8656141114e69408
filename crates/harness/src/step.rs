//! Typed vocabulary of browser actions the flow is made of

use std::path::PathBuf;

/// A single browser action. The verification flow is a fixed sequence of
/// these; every variant is produced by [`crate::flow::FlowConfig::steps`].
#[derive(Debug, Clone, PartialEq)]
pub enum Step {
    /// Navigate to a URL relative to the app base.
    Navigate {
        url: String,
    },

    /// Wait for an element to appear.
    WaitFor {
        selector: String,
        timeout_ms: u64,
    },

    /// Fill an input field (clears existing content first).
    Fill {
        selector: String,
        value: String,
    },

    /// Click a button by its accessible name (role-based locator).
    ClickButton {
        label: String,
    },

    /// Pick an option from a `<select>` element by value.
    Select {
        selector: String,
        value: String,
    },

    /// Capture the page to a PNG file.
    Screenshot {
        path: PathBuf,
        full_page: bool,
    },
}

impl Step {
    /// Short `verb:target` descriptor used in logs and in the progress
    /// protocol emitted by the generated script.
    pub fn label(&self) -> String {
        match self {
            Step::Navigate { url } => format!("navigate:{}", url),
            Step::WaitFor { selector, .. } => format!("wait:{}", selector),
            Step::Fill { selector, .. } => format!("fill:{}", selector),
            Step::ClickButton { label } => format!("click:{}", label),
            Step::Select { selector, .. } => format!("select:{}", selector),
            Step::Screenshot { path, .. } => {
                format!("screenshot:{}", path.display())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels_name_the_target() {
        let step = Step::Fill {
            selector: "input[name=\"email\"]".into(),
            value: "user@example.com".into(),
        };
        assert_eq!(step.label(), "fill:input[name=\"email\"]");

        let step = Step::ClickButton { label: "Entrar".into() };
        assert_eq!(step.label(), "click:Entrar");

        let step = Step::Screenshot {
            path: PathBuf::from("verification.png"),
            full_page: false,
        };
        assert_eq!(step.label(), "screenshot:verification.png");
    }

    #[test]
    fn wait_label_ignores_timeout() {
        let step = Step::WaitFor {
            selector: "select[name=\"discount_type\"]".into(),
            timeout_ms: 60_000,
        };
        assert_eq!(step.label(), "wait:select[name=\"discount_type\"]");
    }
}
