use serde::Serialize;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TextObject {
    #[serde(rename = "plain_text")]
    Plain { text: String },
    Mrkdwn { text: String },
}

impl TextObject {
    pub fn plain(text: impl Into<String>) -> Self {
        Self::Plain { text: text.into() }
    }

    pub fn mrkdwn(text: impl Into<String>) -> Self {
        Self::Mrkdwn { text: text.into() }
    }

    pub fn text(&self) -> &str {
        match self {
            Self::Plain { text } | Self::Mrkdwn { text } => text,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ButtonStyle {
    Primary,
    Danger,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ButtonElement {
    pub action_id: String,
    pub text: TextObject,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub style: Option<ButtonStyle>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

impl ButtonElement {
    pub fn new(action_id: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            action_id: action_id.into(),
            text: TextObject::plain(label),
            style: None,
            value: None,
            url: None,
        }
    }

    pub fn style(mut self, style: ButtonStyle) -> Self {
        self.style = Some(style);
        self
    }

    pub fn value(mut self, value: impl Into<String>) -> Self {
        self.value = Some(value.into());
        self
    }

    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Element {
    Button(ButtonElement),
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Block {
    Section { block_id: String, text: TextObject },
    Header { block_id: String, text: TextObject },
    Image { block_id: String, title: TextObject, image_url: String, alt_text: String },
    Actions { block_id: String, elements: Vec<Element> },
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct MessageTemplate {
    pub fallback_text: String,
    pub blocks: Vec<Block>,
}

pub struct MessageBuilder {
    fallback_text: String,
    blocks: Vec<Block>,
}

impl MessageBuilder {
    pub fn new(fallback_text: impl Into<String>) -> Self {
        Self { fallback_text: fallback_text.into(), blocks: Vec::new() }
    }

    pub fn section<F>(mut self, block_id: impl Into<String>, build: F) -> Self
    where
        F: FnOnce(&mut SectionBuilder),
    {
        let mut builder = SectionBuilder::default();
        build(&mut builder);
        self.blocks.push(Block::Section { block_id: block_id.into(), text: builder.build() });
        self
    }

    /// Header blocks only accept plain text.
    pub fn header(mut self, block_id: impl Into<String>, text: impl Into<String>) -> Self {
        self.blocks.push(Block::Header { block_id: block_id.into(), text: TextObject::plain(text) });
        self
    }

    pub fn image(
        mut self,
        block_id: impl Into<String>,
        image_url: impl Into<String>,
        title: impl Into<String>,
        alt_text: impl Into<String>,
    ) -> Self {
        self.blocks.push(Block::Image {
            block_id: block_id.into(),
            title: TextObject::plain(title),
            image_url: image_url.into(),
            alt_text: alt_text.into(),
        });
        self
    }

    pub fn actions<F>(mut self, block_id: impl Into<String>, build: F) -> Self
    where
        F: FnOnce(&mut ActionsBuilder),
    {
        let mut builder = ActionsBuilder::default();
        build(&mut builder);
        self.blocks.push(Block::Actions { block_id: block_id.into(), elements: builder.build() });
        self
    }

    pub fn build(self) -> MessageTemplate {
        MessageTemplate { fallback_text: self.fallback_text, blocks: self.blocks }
    }
}

#[derive(Default)]
pub struct SectionBuilder {
    text: Option<TextObject>,
}

impl SectionBuilder {
    pub fn plain(&mut self, text: impl Into<String>) -> &mut Self {
        self.text = Some(TextObject::plain(text));
        self
    }

    pub fn mrkdwn(&mut self, text: impl Into<String>) -> &mut Self {
        self.text = Some(TextObject::mrkdwn(text));
        self
    }

    fn build(self) -> TextObject {
        self.text.unwrap_or_else(|| TextObject::plain(""))
    }
}

#[derive(Default)]
pub struct ActionsBuilder {
    elements: Vec<Element>,
}

impl ActionsBuilder {
    pub fn button(&mut self, button: ButtonElement) -> &mut Self {
        self.elements.push(Element::Button(button));
        self
    }

    fn build(self) -> Vec<Element> {
        self.elements
    }
}

const PREVIEW_TITLE: &str = "Dashboard preview";
const PREVIEW_ALT_TEXT: &str = "dashboard preview";
const UNFURL_DESCRIPTION: &str = "Here is the dashboard that I wanted to show you";

/// Layout posted to each channel a dashboard is shared with.
///
/// Slack rejects sections with empty text, so a blank `message` drops the
/// message section instead of sending it.
pub fn dashboard_share_message(
    title: &str,
    dashboard_link: &str,
    message: &str,
    image_url: &str,
) -> MessageTemplate {
    let mut builder = MessageBuilder::new(title.to_owned())
        .section("dashboard.share.title.v1", |section| {
            section.mrkdwn(format!("<{dashboard_link}|*{title}*>"));
        });

    if !message.trim().is_empty() {
        builder = builder.section("dashboard.share.message.v1", |section| {
            section.plain(message);
        });
    }

    builder
        .image("dashboard.share.preview.v1", image_url, PREVIEW_TITLE, PREVIEW_ALT_TEXT)
        .actions("dashboard.share.actions.v1", |actions| {
            actions.button(
                ButtonElement::new("dashboard.share.open.v1", "View in Grafana")
                    .style(ButtonStyle::Primary)
                    .value("View in Grafana")
                    .url(dashboard_link),
            );
        })
        .build()
}

/// Preview card attached to a shared dashboard link.
pub fn dashboard_unfurl_message(title: &str, link_url: &str, image_url: &str) -> MessageTemplate {
    MessageBuilder::new(title.to_owned())
        .header("dashboard.unfurl.header.v1", title)
        .section("dashboard.unfurl.description.v1", |section| {
            section.plain(UNFURL_DESCRIPTION);
        })
        .image("dashboard.unfurl.preview.v1", image_url, PREVIEW_TITLE, PREVIEW_ALT_TEXT)
        .actions("dashboard.unfurl.actions.v1", |actions| {
            actions.button(
                ButtonElement::new("dashboard.unfurl.open.v1", "View Dashboard")
                    .style(ButtonStyle::Primary)
                    .value(link_url)
                    .url(link_url),
            );
        })
        .build()
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{dashboard_share_message, dashboard_unfurl_message, Block, Element, TextObject};

    #[test]
    fn share_message_has_title_message_image_and_button() {
        let message = dashboard_share_message(
            "Node Exporter",
            "http://localhost:3000/d/abc/node",
            "look at this spike",
            "http://localhost:3000/public/img/attachments/abc.png",
        );

        assert_eq!(message.fallback_text, "Node Exporter");
        assert_eq!(message.blocks.len(), 4);
        assert!(matches!(
            &message.blocks[0],
            Block::Section { text: TextObject::Mrkdwn { text }, .. }
                if text == "<http://localhost:3000/d/abc/node|*Node Exporter*>"
        ));
        assert!(matches!(
            &message.blocks[1],
            Block::Section { text: TextObject::Plain { text }, .. } if text == "look at this spike"
        ));
        assert!(matches!(
            &message.blocks[2],
            Block::Image { image_url, .. } if image_url.ends_with("/abc.png")
        ));

        let button = if let Block::Actions { elements, .. } = &message.blocks[3] {
            elements.first()
        } else {
            None
        };
        let Some(Element::Button(button)) = button else {
            panic!("expected a button in the actions block");
        };
        assert_eq!(button.text.text(), "View in Grafana");
        assert_eq!(button.url.as_deref(), Some("http://localhost:3000/d/abc/node"));
    }

    #[test]
    fn blank_share_message_omits_message_section() {
        let message = dashboard_share_message("Title", "http://x/d/a/b", "   ", "http://x/i.png");

        assert_eq!(message.blocks.len(), 3);
        assert!(matches!(message.blocks[1], Block::Image { .. }));
    }

    #[test]
    fn unfurl_blocks_serialize_to_slack_block_kit() {
        let message = dashboard_unfurl_message(
            "Cluster",
            "https://grafana.example.com/d/abc/cluster",
            "https://grafana.example.com/public/img/attachments/abc.png",
        );

        let value = serde_json::to_value(&message.blocks).expect("blocks serialize");

        assert_eq!(
            value,
            json!([
                {
                    "type": "header",
                    "block_id": "dashboard.unfurl.header.v1",
                    "text": { "type": "plain_text", "text": "Cluster" }
                },
                {
                    "type": "section",
                    "block_id": "dashboard.unfurl.description.v1",
                    "text": {
                        "type": "plain_text",
                        "text": "Here is the dashboard that I wanted to show you"
                    }
                },
                {
                    "type": "image",
                    "block_id": "dashboard.unfurl.preview.v1",
                    "title": { "type": "plain_text", "text": "Dashboard preview" },
                    "image_url": "https://grafana.example.com/public/img/attachments/abc.png",
                    "alt_text": "dashboard preview"
                },
                {
                    "type": "actions",
                    "block_id": "dashboard.unfurl.actions.v1",
                    "elements": [{
                        "type": "button",
                        "action_id": "dashboard.unfurl.open.v1",
                        "text": { "type": "plain_text", "text": "View Dashboard" },
                        "style": "primary",
                        "value": "https://grafana.example.com/d/abc/cluster",
                        "url": "https://grafana.example.com/d/abc/cluster"
                    }]
                }
            ])
        );
    }

    #[test]
    fn share_layout_is_stable_across_calls() {
        let first = dashboard_share_message("T", "http://x/d/a/b", "m", "http://x/i.png");
        let second = dashboard_share_message("T", "http://x/d/a/b", "m", "http://x/i.png");

        assert_eq!(first, second);
    }
}
