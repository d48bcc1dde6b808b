use crate::keyboard::Keyboard;

/// One engine turn's output: the text to show and the keyboard to attach.
/// The bot transport renders this; the engine never talks to a transport
/// directly (spec §4.G: "reply to the user with text + keyboard").
#[derive(Debug, Clone)]
pub struct Prompt {
    pub text: String,
    pub keyboard: Keyboard,
}

/// Everything a single `handle` call produces: the next prompt to show,
/// plus an optional reminder offer for the bot layer to attach as extra
/// inline buttons (spec §4.G).
#[derive(Debug, Clone)]
pub struct Outcome {
    pub prompt: Prompt,
    pub reminder_offer: Option<ReminderOffer>,
}

/// One button per line group with more than one hop (spec §4.G).
#[derive(Debug, Clone)]
pub struct ReminderOffer {
    pub route_fingerprint: String,
    pub buttons: Vec<ReminderOfferButton>,
}

#[derive(Debug, Clone)]
pub struct ReminderOfferButton {
    pub group_index: usize,
    pub label: String,
    pub arm_payload: String,
}
