//! Text direction and the fixed English/Arabic string catalog.
//!
//! The widget only knows two locales: left-to-right English and
//! right-to-left Arabic. [`Direction`] is passed explicitly to everything
//! that needs it; there is no process-wide direction state.

use serde::{Deserialize, Serialize};

/// Language tag prefixes that switch the widget to right-to-left.
const RTL_LANGUAGES: [&str; 4] = ["ar", "he", "fa", "ur"];

/// Font stack used for text containing Arabic script.
pub const ARABIC_FONT_FAMILY: &str = "'Tajawal', sans-serif";

/// Font stack used for everything else.
pub const LATIN_FONT_FAMILY: &str = "'Inter', sans-serif";

/// Layout and language direction of a widget instance.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Left-to-right, English strings.
    #[default]
    Ltr,
    /// Right-to-left, Arabic strings.
    Rtl,
}

impl Direction {
    /// Map the wire-level `isRTL` flag to a direction.
    #[must_use]
    pub fn from_rtl(is_rtl: bool) -> Self {
        if is_rtl { Self::Rtl } else { Self::Ltr }
    }

    /// Pick the initial direction from a document's `dir` attribute and
    /// language tag.
    ///
    /// Either signal is enough: `dir="rtl"`, or a language tag starting
    /// with one of the right-to-left languages.
    ///
    /// ```rust
    /// use mandaleen_chat::locale::Direction;
    ///
    /// assert_eq!(Direction::detect(None, Some("ar-EG")), Direction::Rtl);
    /// assert_eq!(Direction::detect(Some("ltr"), Some("en")), Direction::Ltr);
    /// ```
    #[must_use]
    pub fn detect(dir_attr: Option<&str>, lang: Option<&str>) -> Self {
        let dir_is_rtl = dir_attr.is_some_and(|d| d.trim().eq_ignore_ascii_case("rtl"));
        let lang_is_rtl = lang.is_some_and(|l| {
            let l = l.trim().to_ascii_lowercase();
            RTL_LANGUAGES.iter().any(|prefix| l.starts_with(prefix))
        });
        Self::from_rtl(dir_is_rtl || lang_is_rtl)
    }

    #[must_use]
    pub fn is_rtl(self) -> bool {
        matches!(self, Self::Rtl)
    }

    /// The other direction.
    #[must_use]
    pub fn toggled(self) -> Self {
        match self {
            Self::Ltr => Self::Rtl,
            Self::Rtl => Self::Ltr,
        }
    }

    /// Value for an HTML `dir` attribute.
    #[must_use]
    pub fn html_dir(self) -> &'static str {
        match self {
            Self::Ltr => "ltr",
            Self::Rtl => "rtl",
        }
    }

    /// The fixed strings for this direction.
    #[must_use]
    pub fn strings(self) -> &'static Strings {
        match self {
            Self::Ltr => &ENGLISH,
            Self::Rtl => &ARABIC,
        }
    }
}

/// User-visible strings that do not come from configuration.
#[derive(Debug)]
pub struct Strings {
    /// Reply used when the webhook answered but carried no usable text.
    pub acknowledgment: &'static str,
    /// Reply used when the webhook did not answer before the deadline.
    pub timeout: &'static str,
    /// Reply used for transport failures and non-success statuses.
    pub connection_failure: &'static str,
    /// Reply used when handling a send failed in an unexpected way.
    pub unexpected_error: &'static str,
    /// First AI message of a right-to-left session. `None` means the
    /// configured welcome message is used.
    pub welcome: Option<&'static str>,
    /// Typing indicator label.
    pub typing: &'static str,
    /// Input placeholder. `None` means the configured placeholder is used.
    pub placeholder: Option<&'static str>,
    /// Suffix appended to the brand name in the header.
    pub assistant_suffix: &'static str,
    /// Connection status label.
    pub online: &'static str,
    /// Label of the direction toggle button.
    pub toggle_label: &'static str,
    /// Tooltip of the direction toggle button.
    pub toggle_title: &'static str,
}

impl Strings {
    /// Header title for a brand, e.g. `Mandaleen AI`.
    #[must_use]
    pub fn assistant_title(&self, brand_name: &str) -> String {
        format!("{brand_name} {}", self.assistant_suffix)
    }
}

static ENGLISH: Strings = Strings {
    acknowledgment: "Thank you for your message! How can I help you?",
    timeout: "Sorry, the response timed out. Please try again.",
    connection_failure: "Sorry, I can't connect to the service right now. Please try again later.",
    unexpected_error: "Sorry, an unexpected error occurred. Please try again.",
    welcome: None,
    typing: "AI is typing...",
    placeholder: None,
    assistant_suffix: "AI",
    online: "Online",
    toggle_label: "ع",
    toggle_title: "Toggle direction",
};

static ARABIC: Strings = Strings {
    acknowledgment: "شكراً لرسالتك! كيف يمكنني مساعدتك؟",
    timeout: "عذراً، انتهت مهلة الاستجابة. يرجى المحاولة مرة أخرى.",
    connection_failure: "عذراً، لا يمكنني الاتصال بالخدمة حالياً. يرجى المحاولة لاحقاً.",
    unexpected_error: "عذراً، حدث خطأ غير متوقع. يرجى المحاولة مرة أخرى.",
    welcome: Some("مرحباً! أنا مساعدك الذكي. كيف يمكنني مساعدتك اليوم؟"),
    typing: "الذكي الاصطناعي يكتب...",
    placeholder: Some("اكتب رسالتك..."),
    assistant_suffix: "الذكي",
    online: "متصل",
    toggle_label: "EN",
    toggle_title: "تبديل الاتجاه",
};

/// True when `text` contains at least one character from the Arabic
/// Unicode blocks (including presentation forms).
#[must_use]
pub fn is_arabic_text(text: &str) -> bool {
    text.chars().any(|c| {
        matches!(
            c,
            '\u{0600}'..='\u{06FF}'
                | '\u{0750}'..='\u{077F}'
                | '\u{08A0}'..='\u{08FF}'
                | '\u{FB50}'..='\u{FDFF}'
                | '\u{FE70}'..='\u{FEFF}'
        )
    })
}

/// Font stack for rendering `text`.
#[must_use]
pub fn font_family_for(text: &str) -> &'static str {
    if is_arabic_text(text) {
        ARABIC_FONT_FAMILY
    } else {
        LATIN_FONT_FAMILY
    }
}
