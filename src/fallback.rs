// Static contact options shown once no calendar embed could be confirmed

use quick_xml::escape::escape;

use crate::config::{ContactConfig, ProviderConfig};
use crate::i18n::Translate;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContactAction {
    Email,
    WhatsApp,
    OpenCalendar,
}

impl ContactAction {
    pub const ALL: [ContactAction; 3] = [
        ContactAction::Email,
        ContactAction::WhatsApp,
        ContactAction::OpenCalendar,
    ];

    pub fn label_key(&self) -> &'static str {
        match self {
            ContactAction::Email => "booking.error.send_email",
            ContactAction::WhatsApp => "booking.error.whatsapp",
            ContactAction::OpenCalendar => "booking.error.open_calendar",
        }
    }
}

/// Contact options built from fixed templates; nothing here takes visitor input.
#[derive(Debug, Clone)]
pub struct ContactFallback {
    contact: ContactConfig,
    calendar_url: String,
}

impl ContactFallback {
    pub fn new(contact: ContactConfig, providers: &ProviderConfig) -> Self {
        Self {
            contact,
            calendar_url: providers.calcom_public_url(),
        }
    }

    pub fn href(&self, action: ContactAction) -> String {
        match action {
            ContactAction::Email => self.mailto(),
            ContactAction::WhatsApp => format!(
                "https://wa.me/{}?text={}",
                self.contact.whatsapp_number,
                urlencoding::encode(&self.contact.whatsapp_message)
            ),
            ContactAction::OpenCalendar => self.calendar_url.clone(),
        }
    }

    // Mail clients take the subject as written; only line breaks in the body need encoding
    fn mailto(&self) -> String {
        format!(
            "mailto:{}?subject={}&body={}",
            self.contact.email,
            self.contact.email_subject,
            self.contact.email_body.replace('\n', "%0A")
        )
    }

    pub fn render(&self, translator: &dyn Translate) -> String {
        let mut html = String::from(r#"<div class="booking-fallback" role="region">"#);
        html.push_str(&format!(
            "<h3>{}</h3><p>{}</p><div class=\"booking-fallback-actions\">",
            escape(&translator.translate("booking.error.title")),
            escape(&translator.translate("booking.error.subtitle")),
        ));

        for action in ContactAction::ALL {
            html.push_str(&format!(
                r#"<a href="{}" target="_blank" rel="noopener">{}</a>"#,
                escape(&self.href(action)),
                escape(&translator.translate(action.label_key())),
            ));
        }

        html.push_str("</div></div>");
        html
    }
}
