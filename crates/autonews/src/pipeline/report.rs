use std::time::Duration;

use crate::api::SlackReport;
use crate::language::LanguageCode;
use crate::record::TranslationRecord;

/// Summary posted to the reporting channel when a run completes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionReport {
    pub record_id: u64,
    pub language_label: String,
    pub snippet: String,
    pub duration: Duration,
    pub link: String,
}

impl CompletionReport {
    pub fn new(
        record: &TranslationRecord,
        language: &LanguageCode,
        duration: Duration,
        app_base_url: &str,
    ) -> Self {
        Self {
            record_id: record.id,
            language_label: language.label().to_string(),
            snippet: record.title_or_snippet(),
            duration,
            link: format!(
                "{}/translations/{}",
                app_base_url.trim_end_matches('/'),
                record.id
            ),
        }
    }

    pub fn text(&self) -> String {
        let total_seconds = (self.duration.as_millis() as f64 / 1000.0).round() as u64;
        format!(
            "Translation #{} ({}) is ready.\nSummary: {}\nDuration: {} min {} s.\nLink: {}",
            self.record_id,
            self.language_label,
            self.snippet,
            total_seconds / 60,
            total_seconds % 60,
            self.link
        )
    }

    pub fn to_slack(&self, channel_id: &str) -> SlackReport {
        SlackReport {
            channel_id: channel_id.to_string(),
            text: self.text(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_text() {
        let mut record = TranslationRecord::new(7, "match preview text");
        record.headline_raw = None;
        let report = CompletionReport::new(
            &record,
            &LanguageCode::resolve("EN"),
            Duration::from_millis(125_600),
            "https://admin.example.com/",
        );

        assert_eq!(
            report.text(),
            "Translation #7 (English) is ready.\nSummary: match preview text\nDuration: 2 min 6 s.\nLink: https://admin.example.com/translations/7"
        );
    }

    #[test]
    fn test_report_uses_headline_and_channel() {
        let mut record = TranslationRecord::new(3, "body");
        record.headline_raw = Some("Derby preview".to_string());
        let report = CompletionReport::new(
            &record,
            &LanguageCode::resolve("ES"),
            Duration::from_secs(59),
            "http://localhost:5173",
        );

        let slack = report.to_slack("C08QWES1YBG");
        assert_eq!(slack.channel_id, "C08QWES1YBG");
        assert!(slack.text.contains("Summary: Derby preview"));
        assert!(slack.text.contains("Duration: 0 min 59 s."));
    }
}
