//! Card-style chat message payloads.
//!
//! A card has a header (title, subtitle, icon), one section of labelled task
//! fields and one section holding an "Open sheet" button. The JSON shape is the
//! `cardsV2` message format accepted by chat incoming webhooks.

use serde::Serialize;

use crate::fields::{NotificationType, Status};
use crate::task::TaskRecord;

const ICON_BASE: &str = "https://www.gstatic.com/images/icons/material/system/2x";
const SUBTITLE: &str = "From the task tracker bot";

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CardMessage {
    pub cards_v2: Vec<CardEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CardEntry {
    pub card_id: String,
    pub card: Card,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Card {
    pub header: CardHeader,
    pub sections: Vec<Section>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CardHeader {
    pub title: String,
    pub subtitle: String,
    pub image_url: String,
    pub image_type: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Section {
    pub widgets: Vec<Widget>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Widget {
    DecoratedText(DecoratedText),
    ButtonList(ButtonList),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DecoratedText {
    pub start_icon: KnownIcon,
    pub top_label: String,
    pub text: String,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub wrap_text: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct KnownIcon {
    pub known_icon: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ButtonList {
    pub buttons: Vec<Button>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Button {
    pub text: String,
    pub on_click: OnClick,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OnClick {
    pub open_link: OpenLink,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OpenLink {
    pub url: String,
}

/// Header title and icon name for a notification.
///
/// Reminder kinds take precedence; a plain notification picks its variant
/// from the task status.
fn header_style(kind: NotificationType, status: Status) -> (&'static str, &'static str) {
    match (kind, status) {
        (NotificationType::Delayed, _) => ("🔥 [Delayed] The due date has passed!", "warning_amber_black_48dp"),
        (NotificationType::DueToday, _) => ("⏰ [Today] Due today", "alarm_black_48dp"),
        (NotificationType::DueTomorrow, _) => ("⚠️ [Tomorrow] Due tomorrow", "event_black_48dp"),
        (NotificationType::Normal, Status::PendingReview) => {
            ("🟡 [Review] Please review and approve", "account_circle_black_48dp")
        }
        (NotificationType::Normal, Status::Done) => ("🟢 [Done] Task completed", "check_circle_black_48dp"),
        (NotificationType::Normal, _) => ("[Notice] Task updated", "notifications_black_48dp"),
    }
}

fn escape(s: &str) -> String {
    s.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;")
}

fn field(icon: &str, label: &str, text: String) -> Widget {
    Widget::DecoratedText(DecoratedText {
        start_icon: KnownIcon { known_icon: icon.into() },
        top_label: label.into(),
        text,
        wrap_text: false,
    })
}

/// Build the card for one task.
///
/// `link` is the target of the "Open sheet" button; `card_id` must be unique per message.
pub fn build_card(task: &TaskRecord, kind: NotificationType, link: &str, card_id: String) -> CardMessage {
    let (title, icon) = header_style(kind, task.status);
    let due = task
        .due_date
        .map(|d| d.format("%Y/%m/%d").to_string())
        .unwrap_or_else(|| "Not set".into());

    let mut task_field = field(
        "DESCRIPTION",
        "Task / Process",
        format!(
            "<b>{}</b><br><font color=\"#666666\">{}</font>",
            escape(&task.task_name),
            escape(&task.process_name)
        ),
    );
    if let Widget::DecoratedText(ref mut text) = task_field {
        text.wrap_text = true;
    }

    let details = Section {
        widgets: vec![
            task_field,
            field("PERSON", "Assignee", format!("<b>{}</b>", escape(&task.assignee))),
            field("BOOKMARK", "Status", format!("<b>{}</b>", task.status.label())),
            field("CLOCK", "Due date", format!("<b>{due}</b>")),
        ],
    };
    let actions = Section {
        widgets: vec![Widget::ButtonList(ButtonList {
            buttons: vec![Button {
                text: "Open sheet".into(),
                on_click: OnClick {
                    open_link: OpenLink { url: link.into() },
                },
            }],
        })],
    };

    CardMessage {
        cards_v2: vec![CardEntry {
            card_id,
            card: Card {
                header: CardHeader {
                    title: title.into(),
                    subtitle: SUBTITLE.into(),
                    image_url: format!("{ICON_BASE}/{icon}.png"),
                    image_type: "SQUARE".into(),
                },
                sections: vec![details, actions],
            },
        }],
    }
}

impl CardMessage {
    pub fn title(&self) -> &str {
        self.cards_v2
            .first()
            .map(|c| c.card.header.title.as_str())
            .unwrap_or_default()
    }
}
