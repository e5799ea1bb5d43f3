//! Browser widget script and embed snippets.

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::{Captures, Regex};
use serde::Serialize;
use url::Url;

use crate::settings::PublicSettings;

const WIDGET_TEMPLATE: &str = include_str!("templates/widget.js");

static PLACEHOLDER: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"__([A-Z][A-Z_]*[A-Z])__").ok());

/// Render the self-contained widget script.
///
/// `api_endpoint` is the absolute `/api` base the script calls back to. All
/// settings are embedded as JavaScript string literals, and the script
/// re-fetches the public settings when it loads.
pub fn render_widget_script(api_endpoint: &str, settings: &PublicSettings) -> String {
    let values: HashMap<&str, &str> = HashMap::from([
        ("API_ENDPOINT", api_endpoint),
        ("PRIMARY_COLOR", settings.widget_config.primary_color.as_str()),
        ("POSITION", settings.widget_config.position.as_str()),
        ("TITLE", settings.widget_config.title.as_str()),
        ("WELCOME_MESSAGE", settings.welcome_message.as_str()),
    ]);

    let Some(placeholder) = PLACEHOLDER.as_ref() else {
        return WIDGET_TEMPLATE.to_string();
    };
    placeholder
        .replace_all(WIDGET_TEMPLATE, |caps: &Captures<'_>| {
            match values.get(&caps[1]) {
                Some(value) => js_string_literal(value),
                None => caps[0].to_string(),
            }
        })
        .into_owned()
}

/// Quote `value` as a JavaScript string literal that is also safe inside an
/// inline `<script>` element.
pub fn js_string_literal(value: &str) -> String {
    serde_json::to_string(value)
        .unwrap_or_else(|_| "\"\"".to_string())
        .replace("</", "<\\/")
        .replace('\u{2028}', "\\u2028")
        .replace('\u{2029}', "\\u2029")
}

/// Copy-paste snippets for installing the widget on a page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EmbedSnippets {
    pub script_url: String,
    pub simple: String,
    pub advanced: String,
}

/// Build embed snippets for a backend reachable at `backend_url`.
pub fn embed_snippets(backend_url: &Url) -> EmbedSnippets {
    let base = backend_url.as_str().trim_end_matches('/');
    let script_url = format!("{base}/widget.js");
    let src = html_attribute(&script_url);

    let simple = format!(
        "<!-- Chatbot Widget -->\n<script src=\"{src}\" async></script>"
    );

    let advanced = format!(
        r#"<!-- Chatbot Widget (with page overrides) -->
<script>
  window.ChatbotWidgetConfig = {{
    // position: 'bottom-left',
    // primaryColor: '#3B82F6',
    onOpen: function () {{ console.log('Chatbot opened'); }},
    onClose: function () {{ console.log('Chatbot closed'); }},
    onMessage: function (message, isUser) {{ console.log('Message:', message, 'From user:', isUser); }}
  }};
</script>
<script src="{src}" async></script>

<!-- Control the widget once loaded:
  ChatbotWidget.open()
  ChatbotWidget.close()
  ChatbotWidget.toggle()
  ChatbotWidget.isOpen()
  ChatbotWidget.sendMessage('Hello')
-->"#
    );

    EmbedSnippets {
        script_url,
        simple,
        advanced,
    }
}

fn html_attribute(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('"', "&quot;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::WidgetAppearance;

    fn settings() -> PublicSettings {
        PublicSettings {
            welcome_message: "Hi there!".to_string(),
            widget_config: WidgetAppearance::default(),
        }
    }

    #[test]
    fn script_embeds_settings_as_literals() {
        let script = render_widget_script("https://bot.example/api", &settings());
        assert!(script.contains(r#"apiEndpoint: "https://bot.example/api""#));
        assert!(script.contains(r##"primaryColor: "#3B82F6""##));
        assert!(script.contains(r#"position: "bottom-right""#));
        assert!(script.contains(r#"title: "Chat Support""#));
        assert!(script.contains(r#"var welcomeMessage = "Hi there!";"#));
        assert!(!script.contains("__API_ENDPOINT__"));
        assert!(!script.contains("__WELCOME_MESSAGE__"));
    }

    #[test]
    fn admin_text_cannot_escape_string_literal() {
        let mut settings = settings();
        settings.widget_config.title = "x'; alert(1); //".to_string();
        settings.welcome_message = "\"</script><script>alert(2)</script>".to_string();

        let script = render_widget_script("http://localhost:3001/api", &settings);
        assert!(script.contains(r#"title: "x'; alert(1); //""#));
        assert!(!script.contains("</script>"));
        assert!(script.contains(r#"\"<\/script><script>alert(2)<\/script>"#));
    }

    #[test]
    fn placeholder_text_inside_values_is_not_expanded() {
        let mut settings = settings();
        settings.widget_config.title = "__WELCOME_MESSAGE__".to_string();
        let script = render_widget_script("http://localhost:3001/api", &settings);
        assert!(script.contains(r#"title: "__WELCOME_MESSAGE__""#));
    }

    #[test]
    fn snippets_point_at_widget_script() {
        let snippets = embed_snippets(&Url::parse("https://bot.example/").unwrap());
        assert_eq!(snippets.script_url, "https://bot.example/widget.js");
        assert_eq!(
            snippets.simple,
            "<!-- Chatbot Widget -->\n<script src=\"https://bot.example/widget.js\" async></script>"
        );
        assert!(snippets.advanced.contains("window.ChatbotWidgetConfig"));
        assert!(
            snippets
                .advanced
                .contains(r#"<script src="https://bot.example/widget.js" async></script>"#)
        );
    }
}
