//! HTML page shell and widget fragments.

use chrono::Utc;

use crate::locale::{Direction, font_family_for};
use crate::markdown::{escape_html, render_html};
use crate::session::{ChatMessage, Sender};

use super::widget::WidgetConfig;

/// Landing page with the chat widget mounted.
///
/// The initial direction only sets the document attributes; the widget
/// script mounts its own session from them on load.
#[must_use]
pub fn html_shell(config: &WidgetConfig, direction: Direction) -> String {
    let strings = direction.strings();
    let lang = if direction.is_rtl() { "ar" } else { "en" };
    let dir = direction.html_dir();
    let brand = escape_html(&config.brand_name);
    let title = escape_html(&config.title_for(direction));
    let placeholder = escape_html(config.placeholder_for(direction));
    let position = config.position.css_classes(direction);
    let online = strings.online;
    let toggle = if config.enable_rtl_toggle {
        format!(
            r#"<button type="button" id="chat-dir-toggle" class="p-1.5 rounded-lg bg-white/20 hover:bg-white/30 text-xs font-bold" title="{}">{}</button>"#,
            strings.toggle_title, strings.toggle_label
        )
    } else {
        String::new()
    };

    format!(
        r#"<!DOCTYPE html>
<html lang="{lang}" dir="{dir}">
<head>
    <meta charset="utf-8">
    <meta name="viewport" content="width=device-width, initial-scale=1">
    <meta name="description" content="{brand} AI customer service">
    <title>{brand}</title>
    <link rel="stylesheet" href="/static/app.css">
</head>
<body class="min-h-screen antialiased">
    <main id="app" class="container mx-auto px-4 py-8 max-w-5xl">
        <h1 class="text-3xl font-bold">{brand}</h1>
    </main>

    <div id="chat-widget" class="fixed z-50 {position}" data-enable-rtl-toggle="{toggle_enabled}">
        <section id="chat-panel" class="w-80 rounded-2xl overflow-hidden mb-4 border shadow-2xl" hidden>
            <header class="px-6 py-4 border-b flex items-center justify-between" style="background: linear-gradient(90deg, #FF5C00, #FF8A00)">
                <div>
                    <h3 class="font-semibold text-white text-sm" style="font-family: {title_font}">{title}</h3>
                    <span class="text-xs text-white/80">{online}</span>
                </div>
                <div class="flex items-center gap-2">
                    {toggle}
                    <button type="button" id="chat-close" class="p-1.5 rounded-lg bg-white/20 hover:bg-white/30" aria-label="Close">&times;</button>
                </div>
            </header>
            <div id="chat-messages" class="h-80 overflow-y-auto p-4" aria-live="polite"></div>
            <form id="chat-form" class="p-4 border-t flex items-end gap-3">
                <textarea name="message" rows="1" placeholder="{placeholder}"
                    class="flex-1 px-4 py-3 rounded-xl border resize-none text-sm"
                    style="min-height: 40px; max-height: 120px"></textarea>
                <button type="submit" class="p-3 rounded-xl text-white" style="background: linear-gradient(90deg, #FF5C00, #FF8A00)">&#10148;</button>
            </form>
        </section>
        <button type="button" id="chat-toggle" class="w-14 h-14 rounded-full text-white shadow-2xl" style="background: linear-gradient(90deg, #FF5C00, #FF8A00)" aria-label="Chat">&#128172;</button>
    </div>

    <script>{WIDGET_SCRIPT}</script>
</body>
</html>"#,
        toggle_enabled = config.enable_rtl_toggle,
        title_font = font_family_for(&config.title_for(direction)),
    )
}

/// Message bubble fragment.
///
/// User text is shown as-is; AI text goes through the Markdown renderer.
#[must_use]
pub fn message_bubble(message: &ChatMessage, direction: Direction) -> String {
    let is_user = message.is_user();
    // Bubbles of the user sit on the trailing side of the reading direction.
    let row = if is_user != direction.is_rtl() {
        "flex-row-reverse"
    } else {
        "flex-row"
    };
    let bubble = if is_user {
        "bg-gradient-to-r from-[#FF5C00] to-[#FF8A00] text-white"
    } else {
        "bg-white border border-gray-100 text-gray-800"
    };
    let corner = match (is_user, direction.is_rtl()) {
        (true, false) | (false, true) => "rounded-br-md",
        (true, true) | (false, false) => "rounded-bl-md",
    };
    let body = if is_user {
        format!("<p>{}</p>", escape_html(&message.content))
    } else {
        render_html(&message.content, direction)
    };

    format!(
        r#"<div class="flex items-start gap-3 mb-4 {row}" data-message-id="{id}" data-sender="{sender}"><div class="max-w-[80%] px-4 py-3 rounded-2xl text-sm leading-relaxed shadow-sm {bubble} {corner}" dir="{dir}" style="font-family: {font}"><div class="font-medium">{body}</div><time class="text-xs mt-2 opacity-70" datetime="{datetime}">{clock}</time></div></div>"#,
        id = escape_html(&message.id),
        sender = if is_user { "user" } else { "ai" },
        dir = direction.html_dir(),
        font = font_family_for(&message.content),
        datetime = message.timestamp.to_rfc3339(),
        clock = message.timestamp.format("%H:%M"),
    )
}

/// AI bubble with the locale's unexpected-error text.
///
/// The widget script shows it when a send cannot be completed at all, e.g.
/// the service is unreachable or the session is gone.
#[must_use]
pub fn fallback_bubble(direction: Direction) -> String {
    let message = ChatMessage {
        id: "fallback".to_string(),
        content: direction.strings().unexpected_error.to_string(),
        sender: Sender::Ai,
        timestamp: Utc::now(),
        typing: false,
    };
    message_bubble(&message, direction)
}

/// Typing indicator fragment shown while a reply is pending.
#[must_use]
pub fn typing_indicator(direction: Direction) -> String {
    let row = if direction.is_rtl() {
        " flex-row-reverse"
    } else {
        ""
    };
    format!(
        r#"<div id="chat-typing" class="flex items-center gap-1 px-4 py-2{row}"><span class="typing-dots"></span><span class="text-xs text-gray-500">{}</span></div>"#,
        direction.strings().typing
    )
}

const WIDGET_SCRIPT: &str = r#"
(() => {
    const panel = document.getElementById('chat-panel');
    const list = document.getElementById('chat-messages');
    const form = document.getElementById('chat-form');
    const input = form.querySelector('[name=message]');
    let sessionId = null;
    let typingHtml = '';
    let fallbackHtml = '';
    let sending = false;

    const append = (html) => {
        list.insertAdjacentHTML('beforeend', html);
        list.scrollTop = list.scrollHeight;
    };

    const appendFallback = () => {
        append(fallbackHtml);
        const time = list.lastElementChild?.querySelector('time');
        if (time) {
            const now = new Date();
            time.dateTime = now.toISOString();
            time.textContent = now.toTimeString().slice(0, 5);
        }
    };

    const mount = async () => {
        const res = await fetch('/api/sessions', {
            method: 'POST',
            headers: { 'Content-Type': 'application/json' },
            body: JSON.stringify({
                lang: document.documentElement.lang,
                dir: document.documentElement.dir,
            }),
        });
        const session = await res.json();
        sessionId = session.sessionId;
        typingHtml = session.typingHtml;
        fallbackHtml = session.fallbackHtml;
        session.html.forEach(append);
    };

    const send = async () => {
        const text = input.value.trim();
        if (!text || sending || !sessionId) return;
        sending = true;
        input.value = '';
        input.disabled = true;
        append(typingHtml);
        let delivered = false;
        try {
            const res = await fetch(`/api/sessions/${sessionId}/messages`, {
                method: 'POST',
                headers: { 'Content-Type': 'application/json' },
                body: JSON.stringify({ message: text }),
            });
            if (res.ok) {
                const out = await res.json();
                document.getElementById('chat-typing')?.remove();
                append(out.userHtml);
                append(out.replyHtml);
                delivered = true;
            }
        } catch (err) {
            console.error('chat send failed', err);
        } finally {
            document.getElementById('chat-typing')?.remove();
            if (!delivered) {
                appendFallback();
                if (!input.value) input.value = text;
            }
            sending = false;
            input.disabled = false;
        }
    };

    form.addEventListener('submit', (e) => { e.preventDefault(); send(); });
    input.addEventListener('keydown', (e) => {
        if (e.key === 'Enter' && !e.shiftKey) { e.preventDefault(); send(); }
    });
    const toggle = () => { panel.hidden = !panel.hidden; };
    document.getElementById('chat-toggle').addEventListener('click', toggle);
    document.getElementById('chat-close').addEventListener('click', toggle);

    const dirToggle = document.getElementById('chat-dir-toggle');
    if (dirToggle) {
        dirToggle.addEventListener('click', async () => {
            if (!sessionId) return;
            const res = await fetch(`/api/sessions/${sessionId}/direction`, {
                method: 'POST',
                headers: { 'Content-Type': 'application/json' },
                body: '{}',
            });
            if (!res.ok) return;
            const out = await res.json();
            typingHtml = out.typingHtml;
            fallbackHtml = out.fallbackHtml;
            document.documentElement.dir = out.isRTL ? 'rtl' : 'ltr';
            document.documentElement.lang = out.isRTL ? 'ar' : 'en';
        });
    }

    window.addEventListener('pagehide', () => {
        if (sessionId) fetch(`/api/sessions/${sessionId}`, { method: 'DELETE', keepalive: true });
    });

    mount();
})();
"#;
