//! Showing aggregated validation failures to the visitor.

use ironhtml::html;
use ironhtml::typed::Element;
use ironhtml_elements::{Div, Li, Ul};

use crate::error::ValidationErrors;

/// Receives the failures of a form that did not validate.
pub trait ErrorPresenter {
    /// Shows `title` and the itemized `errors`.
    fn show_error(&mut self, title: &str, errors: &ValidationErrors);
}

/// Renders failures as Bootstrap 5 alerts and keeps them for the layout.
#[derive(Debug, Clone, Default)]
pub struct AlertPresenter {
    alerts: Vec<String>,
}

impl AlertPresenter {
    /// Creates a presenter with no alerts.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the rendered alerts.
    pub fn alerts(&self) -> &[String] {
        &self.alerts
    }

    /// Takes the rendered alerts, leaving none behind.
    pub fn take(&mut self) -> Vec<String> {
        std::mem::take(&mut self.alerts)
    }
}

impl ErrorPresenter for AlertPresenter {
    fn show_error(&mut self, title: &str, errors: &ValidationErrors) {
        self.alerts.push(render_alert(title, errors));
    }
}

/// Renders a title and a list of messages as an alert block.
pub fn render_alert(title: &str, errors: &ValidationErrors) -> String {
    let messages = errors.messages();

    html! { div.class("alert alert-danger") }
        .attr("role", "alert")
        .child::<Div, _>(|d| d.class("alert-heading").text(title))
        .child::<Ul, _>(|ul| {
            ul.class("mb-0")
                .children(messages.iter(), |m, li: Element<Li>| li.text(*m))
        })
        .render()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_alert_lists_every_message() {
        let mut errors = ValidationErrors::new();
        errors.add("email", "Enter an email address.");
        errors.add("age", "Numbers only.");

        let mut presenter = AlertPresenter::new();
        presenter.show_error("Please check the form", &errors);

        let alerts = presenter.take();
        assert_eq!(alerts.len(), 1);
        assert!(alerts[0].contains("alert-danger"));
        assert!(alerts[0].contains("Please check the form"));
        assert!(alerts[0].contains("Enter an email address."));
        assert!(alerts[0].contains("Numbers only."));
        assert!(presenter.alerts().is_empty());
    }
}
