//! Portal page state and rendering
//!
//! [`PortalView`] is a serializable snapshot of what the page shows. It is
//! kept current by folding [`SessionEvent`]s into it, so readers never need
//! the session itself.

use serde::Serialize;

use crate::session::{SessionEvent, WaveSession};
use crate::types::{Account, Notice, SubmissionState, WaveRecord};

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct PortalView {
    pub account: Option<Account>,
    pub waves: Vec<WaveRecord>,
    pub total: u64,
    pub submission: SubmissionState,
    pub notice: Option<Notice>,
}

impl PortalView {
    pub fn from_session(session: &WaveSession) -> Self {
        Self {
            account: session.account().cloned(),
            waves: session.waves().to_vec(),
            total: session.total_waves(),
            submission: session.submission(),
            notice: session.notice(),
        }
    }

    pub fn apply(&mut self, event: &SessionEvent) {
        match event {
            SessionEvent::AccountChanged(account) => self.account = Some(account.clone()),
            SessionEvent::WavesReplaced { waves, total } => {
                self.waves = waves.clone();
                self.total = *total;
            }
            SessionEvent::WaveAppended(wave) => self.waves.push(wave.clone()),
            SessionEvent::TotalRefreshed(total) => self.total = *total,
            SessionEvent::SubmissionChanged(state) => self.submission = *state,
            SessionEvent::NoticeChanged(notice) => self.notice = *notice,
        }
    }

    /// The connect control is offered until an account is set
    pub fn show_connect(&self) -> bool {
        self.account.is_none()
    }

    /// The submit control is enabled for a non-empty draft while idle
    pub fn can_submit(&self, draft: &str) -> bool {
        !self.submission.is_pending() && !draft.trim().is_empty()
    }

    /// Render the whole page
    pub fn render_html(&self) -> String {
        let mut html = String::from(
            "<!DOCTYPE html>\n<html>\n<head><meta charset=\"utf-8\"><title>Wave Portal</title></head>\n<body>\n<div class=\"mainContainer\">\n<div class=\"dataContainer\">\n<div class=\"header\">👋 Hey there!</div>\n<div class=\"bio\">Connect your Ethereum wallet and wave at me with a message!</div>\n",
        );

        let disabled = if self.submission.is_pending() {
            " disabled"
        } else {
            ""
        };
        html.push_str(&format!(
            "<form class=\"formContainer\" method=\"post\" action=\"/wave\">\n<textarea rows=\"5\" cols=\"50\" name=\"message\" placeholder=\"Enter your message...\" required></textarea>\n<button class=\"waveButton\" type=\"submit\"{}>Wave at me!</button>\n</form>\n",
            disabled
        ));

        if let Some(notice) = self.notice {
            html.push_str(&format!("<p class=\"notice\">{}</p>\n", escape_html(notice.text())));
        }

        match &self.account {
            None => html.push_str(
                "<form method=\"post\" action=\"/connect\"><button class=\"waveButton\" type=\"submit\">Connect Wallet</button></form>\n",
            ),
            Some(account) => html.push_str(&format!(
                "<div class=\"account\">Connected: {}</div>\n",
                escape_html(account.as_str())
            )),
        }

        html.push_str(&format!(
            "<div class=\"total\">Total waves: {}</div>\n",
            self.total
        ));

        for wave in &self.waves {
            html.push_str(&format!(
                "<div class=\"wave\" style=\"background-color: OldLace; margin-top: 16px; padding: 8px\">\n<div>Address: {}</div>\n<div>Time: {}</div>\n<div>Message: {}</div>\n</div>\n",
                wave.sender,
                wave.sent_at.format("%a %b %d %Y %H:%M:%S UTC"),
                escape_html(&wave.message)
            ));
        }

        html.push_str("</div>\n</div>\n</body>\n</html>\n");
        html
    }
}

fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Address;
    use chrono::DateTime;

    fn wave(message: &str) -> WaveRecord {
        WaveRecord {
            sender: Address([7; 20]),
            sent_at: DateTime::from_timestamp(1_700_000_000, 0).unwrap(),
            message: message.to_string(),
        }
    }

    #[test]
    fn test_apply_follows_session_events() {
        let mut view = PortalView::default();
        assert!(view.show_connect());

        view.apply(&SessionEvent::AccountChanged(Account::new("0xabc")));
        assert!(!view.show_connect());

        view.apply(&SessionEvent::WavesReplaced {
            waves: vec![wave("a"), wave("b")],
            total: 2,
        });
        view.apply(&SessionEvent::WaveAppended(wave("c")));
        assert_eq!(view.waves.len(), 3);
        assert_eq!(view.total, 2);

        view.apply(&SessionEvent::TotalRefreshed(3));
        view.apply(&SessionEvent::NoticeChanged(Some(Notice::EnterValidMessage)));
        assert_eq!(view.total, 3);
        assert_eq!(view.notice, Some(Notice::EnterValidMessage));
    }

    #[test]
    fn test_submit_disabled_while_pending_or_empty() {
        let mut view = PortalView::default();
        assert!(view.can_submit("hello"));
        assert!(!view.can_submit("   \n"));

        view.apply(&SessionEvent::SubmissionChanged(SubmissionState::Pending));
        assert!(!view.can_submit("hello"));

        view.apply(&SessionEvent::SubmissionChanged(SubmissionState::Idle));
        assert!(view.can_submit("hello"));
    }

    #[test]
    fn test_render_escapes_messages() {
        let view = PortalView {
            waves: vec![wave("<script>alert('x')</script>")],
            total: 1,
            ..Default::default()
        };
        let html = view.render_html();
        assert!(html.contains("&lt;script&gt;alert(&#39;x&#39;)&lt;/script&gt;"));
        assert!(!html.contains("<script>"));
        assert!(html.contains("Connect Wallet"));
        assert!(html.contains("Address: 0x0707070707070707070707070707070707070707"));
    }

    #[test]
    fn test_render_hides_connect_once_connected() {
        let view = PortalView {
            account: Some(Account::new("0xfeed")),
            notice: Some(Notice::EnterValidMessage),
            submission: SubmissionState::Pending,
            ..Default::default()
        };
        let html = view.render_html();
        assert!(!html.contains("Connect Wallet"));
        assert!(html.contains("Connected: 0xfeed"));
        assert!(html.contains("Enter a valid message!"));
        assert!(html.contains("type=\"submit\" disabled>Wave at me!"));
    }
}
