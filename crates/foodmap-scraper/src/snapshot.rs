use crate::browser::BrowserSession;
use crate::error::BrowserError;

/// Everything the offline stages (classification, item extraction) read
/// from a rendered establishment page, captured in one pass so they can run
/// away from the live session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageSnapshot {
    pub url: String,
    pub title: String,
    pub html: String,
    pub visible_text: String,
}

impl PageSnapshot {
    /// Reads URL, title, markup and rendered text of the active tab.
    ///
    /// # Errors
    ///
    /// Propagates the first failing browser read.
    pub async fn capture(session: &dyn BrowserSession) -> Result<Self, BrowserError> {
        Ok(Self {
            url: session.current_url().await?,
            title: session.title().await?,
            html: session.page_source().await?,
            visible_text: session.visible_text().await?,
        })
    }

    /// Non-empty, trimmed lines of the rendered text.
    pub fn lines(&self) -> impl Iterator<Item = &str> {
        self.visible_text
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lines_skip_blank_and_trim() {
        let snapshot = PageSnapshot {
            visible_text: "  Margherita \n\n   \nTomato, mozzarella\n".to_string(),
            ..PageSnapshot::default()
        };
        let lines: Vec<&str> = snapshot.lines().collect();
        assert_eq!(lines, vec!["Margherita", "Tomato, mozzarella"]);
    }
}
