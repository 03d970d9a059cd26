//! Contact details from an establishment's information page.

use std::sync::LazyLock;
use std::time::Duration;

use foodmap_core::{ContactInfo, ScrapeTuning};
use regex::Regex;

use crate::browser::{resolve_href, BrowserSession, Locator};
use crate::error::BrowserError;
use crate::text;

static BR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)<br\s*/?>").expect("valid regex"));

/// Text blocks shorter than this cannot hold a full contact section.
const MIN_BLOCK_CHARS: usize = 50;
const MAX_EMAIL_CHARS: usize = 100;
const MAX_PHONE_CHARS: usize = 50;
const MIN_REGISTRATION_DIGITS: usize = 7;
const SCAN_ATTEMPTS: usize = 3;

#[derive(Debug, Clone)]
pub struct ContactExtractor {
    info_links: Vec<Locator>,
    blocks: Locator,
    link_attempts: usize,
    scroll_px: i64,
    pause: Duration,
    settle: Duration,
    page_load_timeout: Duration,
}

impl ContactExtractor {
    #[must_use]
    pub fn new(tuning: &ScrapeTuning, page_load_timeout: Duration) -> Self {
        Self {
            info_links: tuning
                .selectors
                .info_link
                .iter()
                .map(|s| Locator::parse(s))
                .collect(),
            blocks: Locator::parse(&tuning.selectors.contact_blocks),
            link_attempts: tuning.timing.info_link_attempts.max(1),
            scroll_px: tuning.timing.info_scroll_px,
            pause: Duration::from_millis(tuning.timing.scroll_pause_ms),
            settle: Duration::from_millis(tuning.timing.page_settle_ms),
            page_load_timeout,
        }
    }

    /// Follows the information link of the current page and reads contact
    /// details from it. Missing pieces stay absent; this never fails.
    pub async fn extract(&self, session: &dyn BrowserSession) -> ContactInfo {
        let Some(href) = self.find_info_href(session).await else {
            tracing::debug!("no information link found");
            return ContactInfo::default();
        };

        match self.read_info_page(session, &href).await {
            Ok(contact) => contact,
            Err(e) => {
                tracing::warn!(url = %href, error = %e, "contact extraction failed");
                ContactInfo::default()
            }
        }
    }

    async fn find_info_href(&self, session: &dyn BrowserSession) -> Option<String> {
        for attempt in 0..self.link_attempts {
            for locator in &self.info_links {
                let Ok(link) = session.find_one(locator).await else {
                    continue;
                };
                if let Ok(Some(href)) = session.attribute(link, "href").await {
                    let base = session.current_url().await.unwrap_or_default();
                    return Some(resolve_href(&base, &href));
                }
            }
            tracing::debug!(attempt, "information link not visible yet, scrolling");
            if session.scroll_by(self.scroll_px).await.is_err() {
                return None;
            }
            tokio::time::sleep(self.pause).await;
        }
        None
    }

    async fn read_info_page(
        &self,
        session: &dyn BrowserSession,
        href: &str,
    ) -> Result<ContactInfo, BrowserError> {
        session.navigate(href).await?;
        session.wait_until_ready(self.page_load_timeout).await?;
        tokio::time::sleep(self.settle).await;
        for _ in 0..2 {
            session.scroll_to_bottom().await?;
            tokio::time::sleep(self.pause).await;
        }

        let mut best = ContactInfo::default();
        for _ in 0..SCAN_ATTEMPTS {
            for block in session.find_all(&self.blocks).await? {
                let (Ok(text), Ok(html)) =
                    (session.text(block).await, session.inner_html(block).await)
                else {
                    continue;
                };
                let Some(contact) = parse_contact_block(&text, &html) else {
                    continue;
                };
                if contact.is_complete() {
                    return Ok(contact);
                }
                if field_count(&contact) > field_count(&best) {
                    best = contact;
                }
            }
            session.scroll_to_bottom().await?;
            tokio::time::sleep(self.pause).await;
        }
        Ok(best)
    }
}

fn field_count(contact: &ContactInfo) -> usize {
    [
        contact.email.is_some(),
        contact.phone.is_some(),
        contact.registration_number.is_some(),
    ]
    .into_iter()
    .filter(|present| *present)
    .count()
}

/// Parses a rendered text block when it looks like a contact section: long
/// enough, with an `@` or `+`, and at least one digit. Lines come from `<br>`
/// breaks in the markup when present, text lines otherwise.
#[must_use]
pub fn parse_contact_block(text: &str, html: &str) -> Option<ContactInfo> {
    let trimmed = text.trim();
    if trimmed.chars().count() <= MIN_BLOCK_CHARS
        || !(trimmed.contains('@') || trimmed.contains('+'))
        || !trimmed.chars().any(|c| c.is_ascii_digit())
    {
        return None;
    }

    let lines: Vec<String> = if BR_RE.is_match(html) {
        BR_RE
            .split(html)
            .map(text::clean)
            .filter(|l| !l.is_empty())
            .collect()
    } else {
        trimmed
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(String::from)
            .collect()
    };

    Some(parse_contact_lines(&lines))
}

/// First short line with `@` is the email, first short line with `+` the
/// phone, and the last all-digit line (spaces ignored) of at least seven
/// digits the registration number.
#[must_use]
pub fn parse_contact_lines(lines: &[String]) -> ContactInfo {
    let email = lines
        .iter()
        .find(|l| l.contains('@') && l.chars().count() < MAX_EMAIL_CHARS)
        .cloned();
    let phone = lines
        .iter()
        .find(|l| l.contains('+') && l.chars().count() < MAX_PHONE_CHARS)
        .cloned();
    let registration_number = lines
        .iter()
        .rev()
        .map(|l| l.replace(' ', ""))
        .find(|l| l.len() >= MIN_REGISTRATION_DIGITS && l.chars().all(|c| c.is_ascii_digit()));

    ContactInfo {
        email,
        phone,
        registration_number,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BLOCK_TEXT: &str = "Pizza Roma SAS\n12 rue de la Roquette 75011 Paris\ncontact@pizzaroma.fr\n+33 1 23 45 67 89\n812 345 678 00012";

    #[test]
    fn br_separated_block_is_parsed() {
        let html = "Pizza Roma SAS<br>12 rue de la Roquette 75011 Paris<br>contact@pizzaroma.fr<br/><span>+33 1 23 45 67 89</span><br>812 345 678 00012";
        let contact = parse_contact_block(BLOCK_TEXT, html).expect("contact block");
        assert_eq!(contact.email.as_deref(), Some("contact@pizzaroma.fr"));
        assert_eq!(contact.phone.as_deref(), Some("+33 1 23 45 67 89"));
        assert_eq!(contact.registration_number.as_deref(), Some("81234567800012"));
        assert!(contact.is_complete());
    }

    #[test]
    fn text_lines_are_used_without_breaks() {
        let contact = parse_contact_block(BLOCK_TEXT, "<p>no breaks</p>").expect("contact block");
        assert!(contact.is_complete());
    }

    #[test]
    fn short_or_digitless_blocks_are_ignored() {
        assert!(parse_contact_block("contact@x.fr +33 1", "").is_none());
        let no_digits = "Write to us at hello@example.test for any question about orders";
        assert!(parse_contact_block(no_digits, "").is_none());
    }

    #[test]
    fn last_registration_line_wins_and_short_numbers_are_skipped() {
        let lines: Vec<String> = ["75011", "123 456 789", "987654321"]
            .iter()
            .map(|s| (*s).to_string())
            .collect();
        let contact = parse_contact_lines(&lines);
        assert_eq!(contact.registration_number.as_deref(), Some("987654321"));
        assert!(contact.email.is_none());
    }

    #[test]
    fn overlong_email_and_phone_lines_are_rejected() {
        let lines = vec![
            format!("{}@example.test", "a".repeat(100)),
            format!("+33 {}", "1".repeat(60)),
        ];
        let contact = parse_contact_lines(&lines);
        assert!(contact.email.is_none());
        assert!(contact.phone.is_none());
    }
}
