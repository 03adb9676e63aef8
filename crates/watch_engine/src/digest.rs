use watch_core::RemoteItem;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Digest {
    pub subject: String,
    pub plain: String,
    pub html: String,
}

pub fn render_digest(label: &str, items: &[RemoteItem], is_preview: bool) -> Digest {
    let subject = match (is_preview, items.len()) {
        (false, n) => format!("[{label}] {n} new item{}", plural(n)),
        (true, 0) => format!("[{label}] nothing new"),
        (true, n) => format!("[{label}] nothing new, latest {n} item{}", plural(n)),
    };

    let heading = if is_preview {
        "No new items. Latest matching items:"
    } else {
        "New items:"
    };

    let mut plain = format!("{subject}\n\n{heading}\n");
    let mut html = format!("<h1>{}</h1>\n<h2>{}</h2>\n", escape_html(&subject), heading);

    if items.is_empty() {
        plain.push_str("(none)\n");
        html.push_str("<p>(none)</p>\n");
    }
    for item in items {
        let name = display_name(item);
        let when = item
            .created_at
            .map(|t| t.format("%Y-%m-%d %H:%M UTC").to_string())
            .unwrap_or_else(|| "undated".to_string());

        plain.push_str(&format!("- {name} ({when})"));
        if let Some(link) = &item.link {
            plain.push_str(&format!(" {link}"));
        }
        plain.push('\n');

        let name = escape_html(name);
        match &item.link {
            Some(link) => html.push_str(&format!(
                "<p><a href=\"{}\">{name}</a> <small>{when}</small></p>\n",
                escape_html(link)
            )),
            None => html.push_str(&format!("<p>{name} <small>{when}</small></p>\n")),
        }
    }

    Digest {
        subject,
        plain,
        html,
    }
}

fn display_name(item: &RemoteItem) -> &str {
    if item.name.is_empty() {
        &item.identity
    } else {
        &item.name
    }
}

fn plural(n: usize) -> &'static str {
    if n == 1 {
        ""
    } else {
        "s"
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
