use anyhow::{Context, Result};
use tera::{Context as TeraContext, Tera};

use crate::languages::Messages;
use crate::settings::Settings;

const CLIENT_TEMPLATE: &str = include_str!("templates/client.html.tera");

const RTL_LOCALES: [&str; 1] = ["ar"];

pub(crate) fn render_client_html(settings: &Settings, messages: &Messages) -> Result<String> {
    let mut context = TeraContext::new();
    let lang = settings.lang.trim().to_lowercase();
    let dir = if RTL_LOCALES.contains(&lang.as_str()) {
        "rtl"
    } else {
        "ltr"
    };
    context.insert("lang", &lang);
    context.insert("dir", dir);
    context.insert("messages", messages);
    context.insert("messages_json", &script_json(messages)?);
    context.insert("copy_ack_ms", &settings.copy_ack_ms);
    Tera::one_off(CLIENT_TEMPLATE, &context, true).with_context(|| "failed to render client template")
}

/// JSON that is safe to place inside a `<script>` element.
fn script_json<T: serde::Serialize>(value: &T) -> Result<String> {
    Ok(serde_json::to_string(value)?.replace("</", "<\\/"))
}
