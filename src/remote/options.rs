//! Options applied to every submission.

use crate::config::default_submission_options;

/// Ordered list of options rendered as a preamble ahead of the submitted source.
///
/// Each entry becomes one `options <entry>;` statement. The defaults allow
/// arbitrary identifier names in input data and turn off pagination so the
/// log is not broken into artificial pages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmissionOptions {
    options: Vec<String>,
}

impl SubmissionOptions {
    pub fn new(options: Vec<String>) -> Self {
        Self { options }
    }

    /// No preamble at all; the source is submitted untouched.
    pub fn none() -> Self {
        Self {
            options: Vec::new(),
        }
    }

    pub fn options(&self) -> &[String] {
        &self.options
    }

    /// Renders the preamble, one statement per line, each ending in a newline.
    pub fn preamble(&self) -> String {
        self.options
            .iter()
            .map(|opt| format!("options {};\n", opt.trim()))
            .collect()
    }

    /// Returns `source` with the preamble in front of it.
    pub fn apply(&self, source: &str) -> String {
        let mut program = self.preamble();
        program.push_str(source);
        program
    }
}

impl Default for SubmissionOptions {
    fn default() -> Self {
        Self::new(default_submission_options())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_preamble() {
        let options = SubmissionOptions::default();
        assert_eq!(
            options.preamble(),
            "options validvarname=any;\noptions pagesize=max;\n"
        );
    }

    #[test]
    fn test_empty_list_leaves_source_untouched() {
        let options = SubmissionOptions::none();
        assert_eq!(options.preamble(), "");
        assert_eq!(options.apply("proc print; run;"), "proc print; run;");
    }

    #[test]
    fn test_custom_options_keep_order() {
        let options = SubmissionOptions::new(vec![
            " nodate ".to_string(),
            "linesize=132".to_string(),
        ]);
        assert_eq!(
            options.apply("run;"),
            "options nodate;\noptions linesize=132;\nrun;"
        );
        assert_eq!(options.options().len(), 2);
    }
}
