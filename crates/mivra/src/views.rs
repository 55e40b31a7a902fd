//! Page markup.

use ironhtml::html;
use ironhtml::typed::{Document, Element};
use ironhtml_elements::{
    Body, Button, Div, Form, Head, Html, Input, Label, Meta, Section, Strong, Textarea, Title, H1,
    P,
};

/// Wraps page content in the site layout.
fn layout(title: &str, content: &str) -> String {
    Document::new()
        .doctype()
        .root::<Html, _>(|html_el| {
            html_el
                .attr("lang", "en")
                .child::<Head, _>(|head| {
                    head.child::<Meta, _>(|m| m.attr("charset", "UTF-8"))
                        .child::<Meta, _>(|m| {
                            m.attr("name", "viewport")
                                .attr("content", "width=device-width, initial-scale=1.0")
                        })
                        .child::<Title, _>(|t| t.text(title))
                })
                .child::<Body, _>(|body| body.raw(content))
        })
        .build()
}

/// The home page.
pub fn home(contact_url: &str) -> String {
    let cta = html! {
        a.class("btn").href(#contact_url) {
            "Contact"
        }
    };

    let content = Element::<Section>::new()
        .class("hero container")
        .child::<H1, _>(|h| h.text("Mivra Micro"))
        .child::<P, _>(|p| {
            p.text("Build landing pages and portfolios with ")
                .child::<Strong, _>(|s| s.text("no Composer, no NPM"))
                .text(".")
        })
        .raw(cta.render())
        .render();

    layout("Home | Mivra", &content)
}

/// The contact page. The form posts to `action`.
pub fn contact(action: &str) -> String {
    let content = Element::<Section>::new()
        .class("container")
        .child::<H1, _>(|h| h.text("Contact"))
        .child::<Form, _>(|f| {
            f.attr("id", "contact-form")
                .attr("action", action)
                .attr("method", "post")
                .class("stack")
                .child::<Label, _>(|l| l.text("Name ").child::<Input, _>(|i| text_input(i, "text", "name")))
                .child::<Label, _>(|l| {
                    l.text("Email ").child::<Input, _>(|i| text_input(i, "email", "email"))
                })
                .child::<Label, _>(|l| {
                    l.text("Message ").child::<Textarea, _>(|t| {
                        t.attr("name", "message").attr("required", "required")
                    })
                })
                .child::<Button, _>(|b| b.class("btn").attr("type", "submit").text("Send"))
        })
        .child::<Div, _>(|d| d.attr("id", "contact-result").class("mt"))
        .render();

    layout("Contact | Mivra", &content)
}

fn text_input(input: Element<Input>, kind: &str, name: &str) -> Element<Input> {
    input
        .attr("type", kind)
        .attr("name", name)
        .attr("required", "required")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout_escapes_title() {
        let page = layout("Tom & Jerry <3", "");
        assert!(page.contains("Tom &amp; Jerry &lt;3"));
        assert!(!page.contains("Jerry <3"));
    }

    #[test]
    fn test_home_links_to_contact_url() {
        let page = home("/get-in-touch");
        assert!(page.contains(r#"href="/get-in-touch""#));
        assert!(page.contains("Mivra Micro"));
    }

    #[test]
    fn test_contact_form_posts_to_action() {
        let page = contact("/contact");
        assert!(page.contains(r#"action="/contact""#));
        assert!(page.contains(r#"method="post""#));
        for field in ["name", "email", "message"] {
            assert!(page.contains(&format!(r#"name="{field}""#)));
        }
        assert!(page.contains("Contact | Mivra"));
    }
}
