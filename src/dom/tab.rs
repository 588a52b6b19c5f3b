use crate::dom::{Document, ElementHandle, ElementSnapshot, EmptyContent, SyntheticEvent, WriteMethod};
use crate::error::{RelayError, Result};
use headless_chrome::Tab;
use serde::de::DeserializeOwned;
use serde_json::json;
use std::sync::Arc;

const PAGE_HELPERS: &str = include_str!("page_helpers.js");

/// [`Document`] over a live headless_chrome tab.
///
/// Element handles are CSS paths computed in the page; they are re-resolved on
/// every call, so a re-render that moves an element makes its handle stop
/// resolving instead of pointing at stale state.
#[derive(Clone)]
pub struct TabDocument {
    tab: Arc<Tab>,
}

impl TabDocument {
    pub fn new(tab: Arc<Tab>) -> Self {
        Self { tab }
    }

    pub fn tab(&self) -> &Arc<Tab> {
        &self.tab
    }

    /// Run a script body with the helpers in scope; the body must `return JSON.stringify(...)`
    fn run<T: DeserializeOwned>(&self, body: &str, args: serde_json::Value) -> Result<T> {
        let script = format!(
            "(function() {{\n{}\nconst args = {};\n{}\n}})()",
            PAGE_HELPERS, args, body
        );

        let result = self
            .tab
            .evaluate(&script, false)
            .map_err(|e| RelayError::EvaluationFailed(e.to_string()))?;

        let value = result
            .value
            .ok_or_else(|| RelayError::EvaluationFailed("No value returned from page script".to_string()))?;

        // The page returns a JSON string so nested objects survive the CDP round trip
        let json_str: String = serde_json::from_value(value)
            .map_err(|e| RelayError::EvaluationFailed(format!("Expected a JSON string: {}", e)))?;

        serde_json::from_str(&json_str)
            .map_err(|e| RelayError::EvaluationFailed(format!("Failed to parse page result: {}", e)))
    }

    /// Run a mutation that reports whether the element still resolved
    fn mutate(&self, element: &ElementHandle, body: &str, extra: serde_json::Value) -> Result<bool> {
        let script = format!(
            "const el = relayResolve(args.path);\nif (!el) {{ return JSON.stringify(null); }}\n{}",
            body
        );
        let outcome: Option<bool> = self.run(&script, json!({ "path": element.as_str(), "extra": extra }))?;
        outcome.ok_or_else(|| RelayError::ElementNotFound(element.to_string()))
    }

    /// Show a blocking page alert without blocking the CDP call that raises it
    pub fn alert(&self, message: &str) -> Result<()> {
        let _: bool = self.run(
            "setTimeout(() => window.alert(args.message), 0);\nreturn JSON.stringify(true);",
            json!({ "message": message }),
        )?;
        Ok(())
    }
}

impl Document for TabDocument {
    fn context_id(&self) -> Result<String> {
        self.run(
            "return JSON.stringify(location.href + '#' + String(performance.timeOrigin));",
            json!({}),
        )
    }

    fn query_all(&self, selector: &str) -> Result<Vec<ElementHandle>> {
        let paths: std::result::Result<Vec<String>, String> = self.run(
            r#"
            let found;
            try {
                found = Array.from(document.querySelectorAll(args.selector));
            } catch (e) {
                return JSON.stringify({ Err: String(e) });
            }
            return JSON.stringify({ Ok: found.map(relayPathOf).filter((p) => p !== null) });
            "#,
            json!({ "selector": selector }),
        )?;

        paths
            .map(|paths| paths.into_iter().map(ElementHandle::new).collect())
            .map_err(|reason| RelayError::InvalidSelector { selector: selector.to_string(), reason })
    }

    fn describe(&self, element: &ElementHandle) -> Result<Option<ElementSnapshot>> {
        self.run(
            "const el = relayResolve(args.path);\nreturn JSON.stringify(el ? relayDescribe(el, args.path) : null);",
            json!({ "path": element.as_str() }),
        )
    }

    fn focus(&self, element: &ElementHandle) -> Result<()> {
        self.mutate(element, "el.focus();\nreturn JSON.stringify(true);", json!(null))?;
        Ok(())
    }

    fn clear_content(&self, element: &ElementHandle, empty: EmptyContent) -> Result<()> {
        let body = match empty {
            EmptyContent::Value => {
                r#"
                const proto = el.tagName === 'TEXTAREA' ? HTMLTextAreaElement.prototype : HTMLInputElement.prototype;
                Object.getOwnPropertyDescriptor(proto, 'value').set.call(el, '');
                return JSON.stringify(true);
                "#
            }
            EmptyContent::Paragraph => "el.innerHTML = '<p><br></p>';\nreturn JSON.stringify(true);",
            EmptyContent::Plain => "el.textContent = '';\nreturn JSON.stringify(true);",
        };
        self.mutate(element, body, json!(null))?;
        Ok(())
    }

    fn write_content(&self, element: &ElementHandle, text: &str, method: WriteMethod) -> Result<bool> {
        // The native value setter is used so framework-controlled inputs observe the change
        let body = match method {
            WriteMethod::Value => {
                r#"
                if (!relayIsValueField(el)) { return JSON.stringify(false); }
                const proto = el.tagName === 'TEXTAREA' ? HTMLTextAreaElement.prototype : HTMLInputElement.prototype;
                Object.getOwnPropertyDescriptor(proto, 'value').set.call(el, args.extra);
                return JSON.stringify(true);
                "#
            }
            WriteMethod::InsertText => {
                r#"
                if (!el.isContentEditable) { return JSON.stringify(false); }
                el.focus();
                const selection = window.getSelection();
                const range = document.createRange();
                range.selectNodeContents(el);
                selection.removeAllRanges();
                selection.addRange(range);
                let inserted = false;
                try {
                    inserted = document.execCommand('insertText', false, args.extra);
                } catch (e) {
                    inserted = false;
                }
                if (inserted) { el.classList.remove('ql-blank'); }
                return JSON.stringify(!!inserted);
                "#
            }
            WriteMethod::TextContent => {
                r#"
                el.textContent = args.extra;
                el.classList.remove('ql-blank');
                return JSON.stringify(true);
                "#
            }
        };
        self.mutate(element, body, json!(text))
    }

    fn read_content(&self, element: &ElementHandle) -> Result<Option<String>> {
        self.run(
            r#"
            const el = relayResolve(args.path);
            if (!el) { return JSON.stringify(null); }
            if (relayIsValueField(el)) { return JSON.stringify(el.value); }
            return JSON.stringify(el.isContentEditable ? (el.innerText || '') : (el.textContent || ''));
            "#,
            json!({ "path": element.as_str() }),
        )
    }

    fn dispatch(&self, element: &ElementHandle, event: SyntheticEvent) -> Result<()> {
        match event {
            SyntheticEvent::Input => {
                self.mutate(
                    element,
                    "el.dispatchEvent(new InputEvent('input', { bubbles: true, cancelable: true, inputType: 'insertText' }));\nreturn JSON.stringify(true);",
                    json!(null),
                )?;
            }
            SyntheticEvent::Change => {
                self.mutate(
                    element,
                    "el.dispatchEvent(new Event('change', { bubbles: true }));\nreturn JSON.stringify(true);",
                    json!(null),
                )?;
            }
            SyntheticEvent::Activate => {
                self.mutate(element, "el.click();\nreturn JSON.stringify(true);", json!(null))?;
            }
            SyntheticEvent::PointerClick => {
                // A CDP mouse event at the element's center, indistinguishable from a real click
                let target = self
                    .tab
                    .find_element(element.as_str())
                    .map_err(|e| RelayError::ElementNotFound(format!("{}: {}", element, e)))?;
                target.click().map_err(|e| RelayError::ToolExecutionFailed {
                    tool: "pointer_click".to_string(),
                    reason: e.to_string(),
                })?;
            }
            SyntheticEvent::Key(chord) => {
                self.focus(element)?;
                if !chord.ctrl && !chord.meta && !chord.shift {
                    self.tab.press_key(&chord.key).map_err(|e| RelayError::ToolExecutionFailed {
                        tool: "press_key".to_string(),
                        reason: e.to_string(),
                    })?;
                } else {
                    self.mutate(
                        element,
                        r#"
                        const init = Object.assign({ bubbles: true, cancelable: true, code: args.extra.key }, {
                            key: args.extra.key,
                            ctrlKey: args.extra.ctrl,
                            metaKey: args.extra.meta,
                            shiftKey: args.extra.shift,
                        });
                        el.dispatchEvent(new KeyboardEvent('keydown', init));
                        el.dispatchEvent(new KeyboardEvent('keyup', init));
                        return JSON.stringify(true);
                        "#,
                        json!(chord),
                    )?;
                }
            }
        }
        Ok(())
    }
}
