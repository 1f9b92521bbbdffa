//! Per-process interaction state of the form shell.
use matcher::{FilterCriteria, SAMPLE_QUESTIONS};
use serde::Serialize;

/// What the user last submitted. There is one user, so one context.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SessionContext {
    pub last_query: Option<String>,
    pub job_level: Option<String>,
    pub duration: Option<String>,
}

impl SessionContext {
    /// Record a submission and return the criteria to query with.
    pub fn submit(&mut self, query: &str, job_level: Option<&str>, duration: Option<&str>) -> FilterCriteria {
        self.last_query = Some(query.to_string());
        self.job_level = job_level.map(str::to_string);
        self.duration = duration.map(str::to_string);
        self.criteria()
    }

    pub fn criteria(&self) -> FilterCriteria {
        FilterCriteria::new(self.job_level.as_deref(), self.duration.as_deref())
    }

    /// Put a sample question into the input, unmodified. Unknown indexes are ignored.
    pub fn select_sample(&mut self, index: usize) -> Option<&'static str> {
        let question = SAMPLE_QUESTIONS.get(index).copied()?;
        self.last_query = Some(question.to_string());
        Some(question)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn submit_remembers_raw_selectors() {
        let mut session = SessionContext::default();
        let criteria = session.submit("sales role", Some("All"), Some("30"));
        assert_eq!(session.last_query.as_deref(), Some("sales role"));
        assert_eq!(session.job_level.as_deref(), Some("All"));
        assert!(criteria.job_level.is_none());
        assert_eq!(criteria.duration.as_deref(), Some("30"));
    }

    #[test]
    fn sample_questions_fill_the_input_verbatim() {
        let mut session = SessionContext::default();
        assert_eq!(session.select_sample(2), Some(SAMPLE_QUESTIONS[2]));
        assert_eq!(session.last_query.as_deref(), Some(SAMPLE_QUESTIONS[2]));
        assert_eq!(session.select_sample(3), None);
        assert_eq!(session.last_query.as_deref(), Some(SAMPLE_QUESTIONS[2]));
    }
}
