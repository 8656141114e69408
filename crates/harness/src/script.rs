//! Playwright script generation
//!
//! The harness does not speak to the browser directly; it renders the whole
//! flow as one self-contained Playwright program and hands it to `node`.
//! The generated script reports progress on stdout as one JSON line per
//! completed step, followed by a final result line (see
//! [`crate::browser`] for the parsing side).

use crate::browser::BrowserConfig;
use crate::step::Step;

/// Render the one-shot Playwright program for a flow.
///
/// The whole flow shares a single browser, context and page so that the
/// login session carries over to the quote edit screen. The base URL is
/// embedded without its trailing slash so that `base + path` never
/// doubles one up.
pub fn build_script(browser: &BrowserConfig, base_url: &str, steps: &[Step]) -> String {
    let mut script = String::new();

    script.push_str(&format!(
        r#"const {{ chromium, firefox, webkit }} = require('playwright');

(async () => {{
  const browser = await {engine}.launch({{ headless: {headless} }});
  const context = await browser.newContext({{
    viewport: {{ width: {width}, height: {height} }}
  }});
  const page = await context.newPage();
  const base = {base};
  const t0 = Date.now();
  let current = null;
  const done = () => console.log(JSON.stringify({{ ...current, ms: Date.now() - t0 }}));

  try {{
"#,
        engine = browser.engine.as_str(),
        headless = browser.headless,
        width = browser.viewport_width,
        height = browser.viewport_height,
        base = js_str(base_url.trim_end_matches('/')),
    ));

    for (i, step) in steps.iter().enumerate() {
        let index = i + 1;
        script.push_str(&format!("\n    // step {}: {}\n", index, step.label()));
        script.push_str(&format!(
            "    current = {{ step: {}, label: {} }};\n",
            index,
            js_str(&step.label())
        ));
        script.push_str(&step_js(step));
        script.push_str("    done();\n");
    }

    script.push_str(
        r#"
    console.log(JSON.stringify({ ok: true }));
  } catch (err) {
    console.log(JSON.stringify({ ok: false, ...current, error: String((err && err.message) || err) }));
    process.exitCode = 1;
  } finally {
    await browser.close();
  }
})();
"#,
    );

    script
}

/// JavaScript for a single step, indented for the generated try block.
fn step_js(step: &Step) -> String {
    match step {
        Step::Navigate { url } => {
            format!("    await page.goto(base + {});\n", js_str(url))
        }
        Step::WaitFor { selector, timeout_ms } => {
            format!(
                "    await page.waitForSelector({}, {{ timeout: {} }});\n",
                js_str(selector),
                timeout_ms
            )
        }
        Step::Fill { selector, value } => {
            format!(
                "    await page.locator({}).fill({});\n",
                js_str(selector),
                js_str(value)
            )
        }
        Step::ClickButton { label } => {
            format!(
                "    await page.getByRole('button', {{ name: {} }}).click();\n",
                js_str(label)
            )
        }
        Step::Select { selector, value } => {
            format!(
                "    await page.locator({}).selectOption({});\n",
                js_str(selector),
                js_str(value)
            )
        }
        Step::Screenshot { path, full_page } => {
            format!(
                "    await page.screenshot({{ path: {}, fullPage: {} }});\n",
                js_str(&path.display().to_string()),
                full_page
            )
        }
    }
}

/// Single-quoted JavaScript string literal. Every selector, value, label,
/// URL and path interpolated into the script goes through here.
fn js_str(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('\'');
    for c in value.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\'' => out.push_str("\\'"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c => out.push(c),
        }
    }
    out.push('\'');
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::browser::{BrowserConfig, Engine};
    use std::path::PathBuf;
    use test_case::test_case;

    #[test_case("plain", "'plain'"; "passthrough")]
    #[test_case("it's", "'it\\'s'"; "single quote")]
    #[test_case("a\\b", "'a\\\\b'"; "backslash")]
    #[test_case("a\nb", "'a\\nb'"; "newline")]
    #[test_case("a\tb", "'a\\tb'"; "tab")]
    #[test_case("input[name=\"email\"]", "'input[name=\"email\"]'"; "double quotes untouched")]
    fn js_str_escapes(input: &str, expected: &str) {
        assert_eq!(js_str(input), expected);
    }

    fn sample_steps() -> Vec<Step> {
        vec![
            Step::Navigate { url: "/login".into() },
            Step::WaitFor {
                selector: "input[name=\"email\"]".into(),
                timeout_ms: 30_000,
            },
            Step::Fill {
                selector: "input[name=\"email\"]".into(),
                value: "user@example.com".into(),
            },
            Step::ClickButton { label: "Entrar".into() },
            Step::Select {
                selector: "select[name=\"discount_type\"]".into(),
                value: "percentage".into(),
            },
            Step::Screenshot {
                path: PathBuf::from("verification.png"),
                full_page: false,
            },
        ]
    }

    #[test]
    fn header_reflects_browser_config() {
        let config = BrowserConfig {
            engine: Engine::Firefox,
            headless: false,
            viewport_width: 1920,
            viewport_height: 1080,
            ..Default::default()
        };
        let script = build_script(&config, "http://localhost:3000", &sample_steps());

        assert!(script.contains("firefox.launch({ headless: false })"));
        assert!(script.contains("viewport: { width: 1920, height: 1080 }"));
        assert!(script.contains("const base = 'http://localhost:3000';"));
    }

    #[test]
    fn trailing_slash_on_the_base_does_not_double_up() {
        let script = build_script(
            &BrowserConfig::default(),
            "http://localhost:3000/",
            &sample_steps(),
        );

        assert!(script.contains("const base = 'http://localhost:3000';"));
        assert!(!script.contains("3000/"));
    }

    #[test]
    fn steps_render_as_playwright_calls() {
        let script = build_script(
            &BrowserConfig::default(),
            "http://localhost:3000",
            &sample_steps(),
        );

        assert!(script.contains("await page.goto(base + '/login');"));
        assert!(script.contains(
            "await page.waitForSelector('input[name=\"email\"]', { timeout: 30000 });"
        ));
        assert!(script.contains(
            "await page.locator('input[name=\"email\"]').fill('user@example.com');"
        ));
        assert!(script.contains("await page.getByRole('button', { name: 'Entrar' }).click();"));
        assert!(script.contains(
            "await page.locator('select[name=\"discount_type\"]').selectOption('percentage');"
        ));
        assert!(script.contains("await page.screenshot({ path: 'verification.png', fullPage: false });"));
    }

    #[test]
    fn every_step_is_tracked_and_reported() {
        let steps = sample_steps();
        let script = build_script(&BrowserConfig::default(), "http://localhost:3000", &steps);

        for (i, step) in steps.iter().enumerate() {
            let marker = format!("current = {{ step: {}, label: {} }};", i + 1, js_str(&step.label()));
            assert!(script.contains(&marker), "missing marker: {marker}");
        }
        assert_eq!(script.matches("done();").count(), steps.len());
        assert!(script.contains(r#"console.log(JSON.stringify({ ok: true }));"#));
        assert!(script.contains("process.exitCode = 1;"));
        assert!(script.contains("await browser.close();"));
    }

    #[test]
    fn values_cannot_break_out_of_the_script() {
        let steps = vec![Step::Fill {
            selector: "input[name=\"password\"]".into(),
            value: "it's'); process.exit(0); //".into(),
        }];
        let script = build_script(&BrowserConfig::default(), "http://localhost:3000", &steps);

        assert!(script.contains(r"fill('it\'s\'); process.exit(0); //');"));
    }
}
