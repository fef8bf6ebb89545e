use uuid::Uuid;

use crate::core::shared::enums::QueryKind;

#[derive(Debug, Clone)]
pub struct RenderedEmail {
    pub subject: String,
    pub html: String,
    pub text: String,
}

fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
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

fn intro(kind: QueryKind) -> &'static str {
    match kind {
        QueryKind::Contact => {
            "Thanks for getting in touch. A member of our team will reply to your message shortly."
        }
        QueryKind::Feedback => {
            "Thank you for your feedback. Every response is read by the team and helps shape the platform."
        }
        QueryKind::Support => {
            "We have received your support request and queued it for the support team. We reply in order of priority."
        }
        QueryKind::TechnicalIssue => {
            "Thanks for reporting this issue. Our engineers will review the details and any attachments you sent."
        }
    }
}

fn subject(kind: QueryKind) -> &'static str {
    match kind {
        QueryKind::Contact => "We received your message",
        QueryKind::Feedback => "Thanks for your feedback",
        QueryKind::Support => "Your support request has been received",
        QueryKind::TechnicalIssue => "Your issue report has been received",
    }
}

/// Confirmation sent after a successful submission of any query kind.
pub fn confirmation(kind: QueryKind, name: &str, query_id: Uuid, lookup_url: &str) -> RenderedEmail {
    let subject = format!("{} (ref {})", subject(kind), query_id);
    let greeting = name.trim();

    let text = format!(
        "Hi {greeting},\n\n{intro}\n\nReference: {query_id}\n\nYou can check the status of your {what} at any time:\n{lookup_url}\n\nKeep this reference if you need to contact us about it.\n\nThe Zelene team\n",
        intro = intro(kind),
        what = kind.display_name(),
    );

    let html = format!(
        r#"<!DOCTYPE html>
<html>
  <body style="font-family: sans-serif; color: #1f2933;">
    <p>Hi {greeting},</p>
    <p>{intro}</p>
    <p><strong>Reference:</strong> <code>{query_id}</code></p>
    <p>You can check the status of your {what} at any time:
      <a href="{lookup}">{lookup}</a></p>
    <p>Keep this reference if you need to contact us about it.</p>
    <p>The Zelene team</p>
  </body>
</html>
"#,
        greeting = escape_html(greeting),
        intro = intro(kind),
        what = kind.display_name(),
        lookup = escape_html(lookup_url),
    );

    RenderedEmail { subject, html, text }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_kind_renders_reference() {
        let id = Uuid::new_v4();
        for kind in QueryKind::ALL {
            let email = confirmation(kind, "Marko", id, "https://zelene.dev/queries/lookup/x");
            assert!(email.subject.contains(&id.to_string()));
            assert!(email.text.contains(&id.to_string()));
            assert!(email.html.contains(&id.to_string()));
            assert!(email.text.contains(kind.display_name()));
        }
    }

    #[test]
    fn test_name_is_escaped_in_html() {
        let email = confirmation(
            QueryKind::Contact,
            "<script>alert(1)</script>",
            Uuid::nil(),
            "https://zelene.dev",
        );
        assert!(!email.html.contains("<script>"));
        assert!(email.html.contains("&lt;script&gt;"));
    }
}
