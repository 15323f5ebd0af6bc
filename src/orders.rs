//! Trade order intake.
//!
//! A transport-independent model of the buy/sell dialogue: the chat front end
//! maps incoming commands, button presses and messages to [`Input`] values and
//! renders the returned [`Reply`]. Settlement is behind [`SwapExecutor`].

use async_trait::async_trait;
use std::fmt;

const MENU_PROMPT: &str = "Choose an action:";
const CANCELLED: &str = "Cancelled. Use /start to begin again.";
const UNKNOWN_OPTION: &str = "Unknown option. Use /start.";
const HELP_TEXT: &str = "Commands:\n/start - show main menu\n/cancel - cancel current action\nUse buttons to Buy or Sell.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Buy,
    Sell,
}

impl Direction {
    fn unit(self) -> &'static str {
        match self {
            Direction::Buy => "SOL",
            Direction::Sell => "tokens",
        }
    }

    fn amount_prompt(self) -> &'static str {
        match self {
            Direction::Buy => "Enter buy amount in SOL (e.g., 0.05):",
            Direction::Sell => "Enter sell amount in token units (e.g., 100000):",
        }
    }

    fn amount_example(self) -> &'static str {
        match self {
            Direction::Buy => "0.05",
            Direction::Sell => "100000",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Buy => write!(f, "BUY"),
            Direction::Sell => write!(f, "SELL"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SwapReceipt {
    pub ok: bool,
    pub note: String,
}

/// Settlement capability. Buy amounts are in SOL, sell amounts in token units.
#[async_trait]
pub trait SwapExecutor: Send + Sync {
    async fn execute_swap(&self, direction: Direction, mint: &str, amount: f64) -> SwapReceipt;
}

/// Accepts every well-formed order without touching the chain.
pub struct StubSwapExecutor;

#[async_trait]
impl SwapExecutor for StubSwapExecutor {
    async fn execute_swap(&self, direction: Direction, mint: &str, amount: f64) -> SwapReceipt {
        if !(amount.is_finite() && amount > 0.0) {
            return SwapReceipt {
                ok: false,
                note: "Invalid parameters for swap.".to_string(),
            };
        }

        let note = match direction {
            Direction::Buy => format!("Buy order queued: {amount} SOL → {mint} (stub)."),
            Direction::Sell => format!("Sell order queued: {amount} of {mint} (stub)."),
        };
        SwapReceipt { ok: true, note }
    }
}

/// Cheap shape check for an SPL mint address.
pub fn is_valid_mint(mint: &str) -> bool {
    let mint = mint.trim();
    mint.chars().count() >= 32 && !mint.contains(char::is_whitespace)
}

pub fn parse_amount(text: &str) -> Option<f64> {
    text.trim()
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite() && *v > 0.0)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Button {
    Buy,
    Sell,
    Cancel,
    Back,
    Confirm(Direction),
}

impl Button {
    pub fn callback_data(self) -> &'static str {
        match self {
            Button::Buy => "BUY",
            Button::Sell => "SELL",
            Button::Cancel => "CANCEL",
            Button::Back => "BACK",
            Button::Confirm(Direction::Buy) => "BUY_CONFIRM",
            Button::Confirm(Direction::Sell) => "SELL_CONFIRM",
        }
    }

    pub fn from_callback_data(data: &str) -> Option<Self> {
        match data {
            "BUY" => Some(Button::Buy),
            "SELL" => Some(Button::Sell),
            "CANCEL" => Some(Button::Cancel),
            "BACK" => Some(Button::Back),
            "BUY_CONFIRM" => Some(Button::Confirm(Direction::Buy)),
            "SELL_CONFIRM" => Some(Button::Confirm(Direction::Sell)),
            _ => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Button::Buy => "🟢 Buy",
            Button::Sell => "🔴 Sell",
            Button::Cancel => "❌ Cancel",
            Button::Back => "↩️ Back",
            Button::Confirm(_) => "✅ Confirm",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Keyboard {
    MainMenu,
    Confirm(Direction),
}

impl Keyboard {
    pub fn rows(self) -> Vec<Vec<Button>> {
        match self {
            Keyboard::MainMenu => vec![vec![Button::Buy, Button::Sell], vec![Button::Cancel]],
            Keyboard::Confirm(direction) => vec![vec![
                Button::Confirm(direction),
                Button::Back,
                Button::Cancel,
            ]],
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Input {
    Start,
    Help,
    Cancel,
    Button(Button),
    Text(String),
}

impl Input {
    /// Maps a chat message to an input. Unknown slash commands map to `None`.
    pub fn from_message(text: &str) -> Option<Self> {
        let trimmed = text.trim();
        if let Some(command) = trimmed.strip_prefix('/') {
            let name = command.split(['@', ' ']).next().unwrap_or_default();
            return match name {
                "start" => Some(Input::Start),
                "help" => Some(Input::Help),
                "cancel" => Some(Input::Cancel),
                _ => None,
            };
        }
        Some(Input::Text(text.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Reply {
    pub text: String,
    pub keyboard: Option<Keyboard>,
}

impl Reply {
    fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            keyboard: None,
        }
    }

    fn with_keyboard(text: impl Into<String>, keyboard: Keyboard) -> Self {
        Self {
            text: text.into(),
            keyboard: Some(keyboard),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum OrderState {
    Idle,
    Choosing,
    AskMint(Direction),
    AskAmount {
        direction: Direction,
        mint: String,
    },
    Confirm {
        direction: Direction,
        mint: String,
        amount: f64,
    },
}

/// Dialogue state of one chat. `None` replies mean the input is ignored.
#[derive(Debug)]
pub struct OrderSession {
    state: OrderState,
}

impl Default for OrderSession {
    fn default() -> Self {
        Self::new()
    }
}

impl OrderSession {
    pub fn new() -> Self {
        Self {
            state: OrderState::Idle,
        }
    }

    pub fn is_active(&self) -> bool {
        self.state != OrderState::Idle
    }

    pub async fn handle(&mut self, input: Input, executor: &dyn SwapExecutor) -> Option<Reply> {
        match input {
            Input::Help => return Some(Reply::text(HELP_TEXT)),
            Input::Start => {
                self.state = OrderState::Choosing;
                return Some(Reply::with_keyboard(
                    "Welcome. Choose an action:",
                    Keyboard::MainMenu,
                ));
            }
            Input::Cancel => {
                if !self.is_active() {
                    return None;
                }
                return Some(self.end(CANCELLED));
            }
            _ => {}
        }

        let state = std::mem::replace(&mut self.state, OrderState::Idle);
        match (state, input) {
            (OrderState::Idle, _) => None,

            (OrderState::Choosing, Input::Button(Button::Confirm(_))) => {
                self.state = OrderState::Choosing;
                None
            }
            (OrderState::Choosing, Input::Button(button)) => Some(self.choose(button)),
            (state @ OrderState::Choosing, _) => {
                self.state = state;
                None
            }

            (OrderState::AskMint(direction), Input::Text(text)) => {
                let mint = text.trim();
                if !is_valid_mint(mint) {
                    self.state = OrderState::AskMint(direction);
                    return Some(Reply::text(
                        "That doesn't look like a valid mint. Please send a valid SPL mint address.",
                    ));
                }
                let reply = format!("Mint set: {mint}\n{}", direction.amount_prompt());
                self.state = OrderState::AskAmount {
                    direction,
                    mint: mint.to_string(),
                };
                Some(Reply::text(reply))
            }

            (OrderState::AskAmount { direction, mint }, Input::Text(text)) => {
                let Some(amount) = parse_amount(&text) else {
                    let reply = format!(
                        "Invalid amount. Enter a positive number (e.g., {}):",
                        direction.amount_example()
                    );
                    self.state = OrderState::AskAmount { direction, mint };
                    return Some(Reply::text(reply));
                };
                let review = format!(
                    "Review your order:\nAction: {direction}\nMint: {mint}\nAmount: {amount} {}\n\nConfirm?",
                    direction.unit()
                );
                self.state = OrderState::Confirm {
                    direction,
                    mint,
                    amount,
                };
                Some(Reply::with_keyboard(review, Keyboard::Confirm(direction)))
            }

            (OrderState::AskMint(_) | OrderState::AskAmount { .. }, Input::Button(button)) => {
                Some(self.choose(button))
            }

            (
                OrderState::Confirm {
                    direction,
                    mint,
                    amount,
                },
                Input::Button(Button::Confirm(pressed)),
            ) if pressed == direction => {
                let receipt = executor.execute_swap(direction, &mint, amount).await;
                let prefix = if receipt.ok { "✅ Success" } else { "❌ Failed" };
                Some(Reply::text(format!("{prefix}: {}", receipt.note)))
            }
            (OrderState::Confirm { .. }, Input::Button(Button::Back | Button::Cancel)) => {
                Some(Reply::text(CANCELLED))
            }

            (state, _) => {
                self.state = state;
                None
            }
        }
    }

    /// Menu navigation shared by the menu and the free-text prompts.
    fn choose(&mut self, button: Button) -> Reply {
        match button {
            Button::Buy => {
                self.state = OrderState::AskMint(Direction::Buy);
                Reply::text("Buy selected.\nSend the token mint address:")
            }
            Button::Sell => {
                self.state = OrderState::AskMint(Direction::Sell);
                Reply::text("Sell selected.\nSend the token mint address:")
            }
            Button::Back => {
                self.state = OrderState::Choosing;
                Reply::with_keyboard(MENU_PROMPT, Keyboard::MainMenu)
            }
            Button::Cancel => self.end(CANCELLED),
            Button::Confirm(_) => self.end(UNKNOWN_OPTION),
        }
    }

    fn end(&mut self, text: &str) -> Reply {
        self.state = OrderState::Idle;
        Reply::text(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINT: &str = "DezXAZ8z7PnrnRJjz3wXBoRgixCa6xjnB7YaB1pPB263";

    async fn send(session: &mut OrderSession, input: Input) -> Option<Reply> {
        session.handle(input, &StubSwapExecutor).await
    }

    #[test]
    fn mint_validation() {
        assert!(is_valid_mint(MINT));
        assert!(is_valid_mint(&format!("  {MINT}\n")));
        assert!(!is_valid_mint("short"));
        assert!(!is_valid_mint("DezXAZ8z7PnrnRJjz3wXBoRg ixCa6xjnB7YaB1pPB263"));
    }

    #[test]
    fn amount_parsing() {
        assert_eq!(parse_amount(" 0.05 "), Some(0.05));
        assert_eq!(parse_amount("100000"), Some(100000.0));
        assert_eq!(parse_amount("0"), None);
        assert_eq!(parse_amount("-1"), None);
        assert_eq!(parse_amount("inf"), None);
        assert_eq!(parse_amount("abc"), None);
    }

    #[test]
    fn callback_data_round_trips() {
        for button in [
            Button::Buy,
            Button::Sell,
            Button::Cancel,
            Button::Back,
            Button::Confirm(Direction::Buy),
            Button::Confirm(Direction::Sell),
        ] {
            assert_eq!(Button::from_callback_data(button.callback_data()), Some(button));
        }
        assert_eq!(Button::from_callback_data("NOPE"), None);
    }

    #[test]
    fn keyboard_layouts() {
        let labels = |keyboard: Keyboard| -> Vec<Vec<&str>> {
            keyboard
                .rows()
                .into_iter()
                .map(|row| row.into_iter().map(Button::label).collect())
                .collect()
        };

        assert_eq!(
            labels(Keyboard::MainMenu),
            vec![vec!["🟢 Buy", "🔴 Sell"], vec!["❌ Cancel"]]
        );
        assert_eq!(
            labels(Keyboard::Confirm(Direction::Sell)),
            vec![vec!["✅ Confirm", "↩️ Back", "❌ Cancel"]]
        );
        assert_eq!(
            Keyboard::Confirm(Direction::Sell).rows()[0][0].callback_data(),
            "SELL_CONFIRM"
        );
    }

    #[test]
    fn messages_map_to_inputs() {
        assert_eq!(Input::from_message("/start"), Some(Input::Start));
        assert_eq!(Input::from_message("/cancel@my_bot"), Some(Input::Cancel));
        assert_eq!(Input::from_message("/unknown"), None);
        assert_eq!(Input::from_message("0.5"), Some(Input::Text("0.5".to_string())));
    }

    #[tokio::test]
    async fn full_buy_flow_executes_swap() {
        let mut session = OrderSession::new();

        let menu = send(&mut session, Input::Start).await.unwrap();
        assert_eq!(menu.keyboard, Some(Keyboard::MainMenu));

        let ask = send(&mut session, Input::Button(Button::Buy)).await.unwrap();
        assert!(ask.text.starts_with("Buy selected."));

        let bad = send(&mut session, Input::Text("nope".into())).await.unwrap();
        assert!(bad.text.contains("valid mint"));

        let amount = send(&mut session, Input::Text(MINT.into())).await.unwrap();
        assert_eq!(
            amount.text,
            format!("Mint set: {MINT}\nEnter buy amount in SOL (e.g., 0.05):")
        );

        let bad_amount = send(&mut session, Input::Text("-3".into())).await.unwrap();
        assert_eq!(
            bad_amount.text,
            "Invalid amount. Enter a positive number (e.g., 0.05):"
        );

        let review = send(&mut session, Input::Text("0.05".into())).await.unwrap();
        assert_eq!(review.keyboard, Some(Keyboard::Confirm(Direction::Buy)));
        assert!(review.text.contains("Action: BUY"));
        assert!(review.text.contains("Amount: 0.05 SOL"));

        let done = send(&mut session, Input::Button(Button::Confirm(Direction::Buy)))
            .await
            .unwrap();
        assert_eq!(
            done.text,
            format!("✅ Success: Buy order queued: 0.05 SOL → {MINT} (stub).")
        );
        assert!(!session.is_active());
    }

    #[tokio::test]
    async fn sell_flow_reports_token_units() {
        let mut session = OrderSession::new();
        send(&mut session, Input::Start).await;
        send(&mut session, Input::Button(Button::Sell)).await;
        send(&mut session, Input::Text(MINT.into())).await;

        let review = send(&mut session, Input::Text("100000".into())).await.unwrap();
        assert!(review.text.contains("Amount: 100000 tokens"));

        let done = send(&mut session, Input::Button(Button::Confirm(Direction::Sell)))
            .await
            .unwrap();
        assert_eq!(
            done.text,
            format!("✅ Success: Sell order queued: 100000 of {MINT} (stub).")
        );
    }

    #[tokio::test]
    async fn back_returns_to_menu_and_cancel_ends_session() {
        let mut session = OrderSession::new();
        send(&mut session, Input::Start).await;
        send(&mut session, Input::Button(Button::Buy)).await;

        let menu = send(&mut session, Input::Button(Button::Back)).await.unwrap();
        assert_eq!(menu.text, "Choose an action:");
        assert_eq!(menu.keyboard, Some(Keyboard::MainMenu));

        let cancelled = send(&mut session, Input::Cancel).await.unwrap();
        assert_eq!(cancelled.text, CANCELLED);
        assert!(!session.is_active());
        assert_eq!(send(&mut session, Input::Cancel).await, None);
    }

    #[tokio::test]
    async fn back_at_confirmation_cancels_without_swapping() {
        let mut session = OrderSession::new();
        send(&mut session, Input::Start).await;
        send(&mut session, Input::Button(Button::Buy)).await;
        send(&mut session, Input::Text(MINT.into())).await;
        send(&mut session, Input::Text("1".into())).await;

        let reply = send(&mut session, Input::Button(Button::Back)).await.unwrap();
        assert_eq!(reply.text, CANCELLED);
        assert!(!session.is_active());
    }

    #[tokio::test]
    async fn mismatched_confirm_is_ignored() {
        let mut session = OrderSession::new();
        send(&mut session, Input::Start).await;
        send(&mut session, Input::Button(Button::Buy)).await;
        send(&mut session, Input::Text(MINT.into())).await;
        send(&mut session, Input::Text("1".into())).await;

        let ignored = send(&mut session, Input::Button(Button::Confirm(Direction::Sell))).await;
        assert_eq!(ignored, None);
        assert!(session.is_active());
    }

    #[tokio::test]
    async fn confirm_while_entering_mint_ends_with_unknown_option() {
        let mut session = OrderSession::new();
        send(&mut session, Input::Start).await;
        send(&mut session, Input::Button(Button::Sell)).await;

        let reply = send(&mut session, Input::Button(Button::Confirm(Direction::Sell)))
            .await
            .unwrap();
        assert_eq!(reply.text, UNKNOWN_OPTION);
        assert!(!session.is_active());
    }

    #[tokio::test]
    async fn idle_session_ignores_text_and_answers_help() {
        let mut session = OrderSession::new();
        assert_eq!(send(&mut session, Input::Text("hello".into())).await, None);

        let help = send(&mut session, Input::Help).await.unwrap();
        assert!(help.text.contains("/start"));
        assert!(!session.is_active());
    }
}
