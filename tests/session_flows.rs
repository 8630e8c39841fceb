//! End-to-end session flows: router over a real store in a temp directory,
//! with a scriptable in-memory price gateway and paper execution.

use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use pretty_assertions::assert_eq;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use secrecy::ExposeSecret;

use tradevault::agent::{Action, Router, UserEvent};
use tradevault::error::GatewayError;
use tradevault::executor::PaperExecutor;
use tradevault::gateway::{PriceGateway, TokenMetadata};
use tradevault::ledger::TradeKind;
use tradevault::session::ConversationState;
use tradevault::store::RecordStore;
use tradevault::vault::MasterKey;
use tradevault::wallet::Wallet;

const KEY_HEX: &str = "a1a1a1a1a1a1a1a1a1a1a1a1a1a1a1a1a1a1a1a1a1a1a1a1a1a1a1a1a1a1a1a1";
const MINT: &str = "9WzDXwBbmkg8ZTbNMqUxvQRAyrZzDsGYdLVL9zYtAWWM";

struct FakeGateway {
    sol_usd: Mutex<Decimal>,
    tokens: Mutex<HashMap<String, TokenMetadata>>,
    down: AtomicBool,
}

impl FakeGateway {
    fn new() -> Self {
        Self {
            sol_usd: Mutex::new(dec!(150)),
            tokens: Mutex::new(HashMap::new()),
            down: AtomicBool::new(false),
        }
    }

    fn set_token(&self, address: &str, symbol: &str, decimals: u32, price_usd: Decimal) {
        self.tokens.lock().unwrap().insert(
            address.to_string(),
            TokenMetadata {
                symbol: symbol.to_string(),
                decimals,
                price_usd,
                liquidity_usd: dec!(100000),
                volume_24h_usd: dec!(5000),
                market_cap_usd: None,
                fdv_usd: None,
                verified: true,
                tags: Vec::new(),
                mint_authority_disabled: true,
                freeze_authority_disabled: true,
                holder_count: Some(1000),
            },
        );
    }

    fn go_down(&self) {
        self.down.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl PriceGateway for FakeGateway {
    async fn token_metadata(&self, address: &str) -> Result<TokenMetadata, GatewayError> {
        if self.down.load(Ordering::SeqCst) {
            return Err(GatewayError::Gateway("gateway offline".to_string()));
        }
        self.tokens
            .lock()
            .unwrap()
            .get(address)
            .cloned()
            .ok_or(GatewayError::NotFound {
                address: address.to_string(),
            })
    }

    async fn sol_usd_price(&self) -> Result<Decimal, GatewayError> {
        if self.down.load(Ordering::SeqCst) {
            return Err(GatewayError::Gateway("gateway offline".to_string()));
        }
        Ok(*self.sol_usd.lock().unwrap())
    }
}

fn open_store(dir: &Path) -> Arc<RecordStore> {
    let key = MasterKey::from_hex(KEY_HEX).unwrap();
    Arc::new(RecordStore::open(dir, key).unwrap())
}

fn harness(dir: &Path) -> (Arc<RecordStore>, Arc<FakeGateway>, Router) {
    let store = open_store(dir);
    let gateway = Arc::new(FakeGateway::new());
    let executor = Arc::new(PaperExecutor::new(gateway.clone()));
    let router = Router::new(store.clone(), gateway.clone(), executor);
    (store, gateway, router)
}

async fn with_wallet(router: &Router, user: &str) {
    let reply = router.handle(user, UserEvent::Action(Action::CreateWallet)).await;
    assert!(reply.text.contains("Wallet created"), "{}", reply.text);
}

#[tokio::test]
async fn buy_appends_to_the_ledger_and_survives_restart() {
    let dir = tempfile::tempdir().unwrap();
    let (_, gateway, router) = harness(dir.path());
    // 3 USD / 150 USD-per-SOL = 0.02 SOL per token.
    gateway.set_token(MINT, "TOK", 6, dec!(3));
    with_wallet(&router, "alice").await;

    let reply = router
        .handle(
            "alice",
            UserEvent::Action(Action::Buy {
                token_address: MINT.to_string(),
                sol_amount: dec!(1),
            }),
        )
        .await;
    assert!(reply.text.contains("Bought"), "{}", reply.text);

    // Cold store: nothing cached, the trade must come back from disk.
    let store = open_store(dir.path());
    let record = store.load("alice").await.unwrap();
    let events = record.transactions();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].kind, TradeKind::Buy);
    assert_eq!(events[0].token_symbol, "TOK");
    assert_eq!(events[0].counter_asset_amount, dec!(1));
    assert_eq!(events[0].token_amount, dec!(50));
}

#[tokio::test]
async fn custom_buy_round_trips_through_the_pending_state() {
    let dir = tempfile::tempdir().unwrap();
    let (store, gateway, router) = harness(dir.path());
    gateway.set_token(MINT, "TOK", 6, dec!(3));
    with_wallet(&router, "bob").await;

    let reply = router
        .handle(
            "bob",
            UserEvent::Action(Action::BuyCustom {
                token_address: MINT.to_string(),
            }),
        )
        .await;
    assert!(reply.text.contains("SOL amount"), "{}", reply.text);

    // The awaiting state is durable, not just cached.
    let on_disk = store.load_from_disk("bob").await.unwrap().unwrap();
    assert_eq!(
        on_disk.state,
        Some(ConversationState::AwaitingBuyAmount {
            token_address: MINT.to_string(),
        })
    );

    let reply = router.handle("bob", UserEvent::Text("2".to_string())).await;
    assert!(reply.text.contains("Bought"), "{}", reply.text);

    let on_disk = store.load_from_disk("bob").await.unwrap().unwrap();
    assert_eq!(on_disk.state, None);
    assert_eq!(on_disk.transactions().len(), 1);
    assert_eq!(on_disk.transactions()[0].counter_asset_amount, dec!(2));
}

#[tokio::test]
async fn invalid_pending_input_clears_state_and_changes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let (store, _, router) = harness(dir.path());

    router
        .handle("carol", UserEvent::Action(Action::SetBuySlippage))
        .await;
    let reply = router
        .handle("carol", UserEvent::Text("lots".to_string()))
        .await;
    assert!(reply.text.contains("not a number"), "{}", reply.text);

    let on_disk = store.load_from_disk("carol").await.unwrap().unwrap();
    assert_eq!(on_disk.state, None);
    assert_eq!(on_disk.settings.buy_slippage_bps, 50);
}

#[tokio::test]
async fn slippage_update_is_durable() {
    let dir = tempfile::tempdir().unwrap();
    let (_, _, router) = harness(dir.path());

    router
        .handle("dave", UserEvent::Action(Action::SetSellSlippage))
        .await;
    let reply = router
        .handle("dave", UserEvent::Text("1.5".to_string()))
        .await;
    assert!(reply.text.contains("150 bps"), "{}", reply.text);

    let store = open_store(dir.path());
    let record = store.load("dave").await.unwrap();
    assert_eq!(record.settings.sell_slippage_bps, 150);
    assert_eq!(record.settings.buy_slippage_bps, 50);
}

#[tokio::test]
async fn oversell_is_rejected_without_a_ledger_entry() {
    let dir = tempfile::tempdir().unwrap();
    let (store, gateway, router) = harness(dir.path());
    gateway.set_token(MINT, "TOK", 6, dec!(3));
    with_wallet(&router, "erin").await;

    router
        .handle(
            "erin",
            UserEvent::Action(Action::Buy {
                token_address: MINT.to_string(),
                sol_amount: dec!(1),
            }),
        )
        .await;

    router
        .handle(
            "erin",
            UserEvent::Action(Action::SellCustom {
                token_address: MINT.to_string(),
            }),
        )
        .await;
    let reply = router
        .handle("erin", UserEvent::Text("100".to_string()))
        .await;
    assert!(reply.text.contains("exceeds net holdings"), "{}", reply.text);

    let record = store.load("erin").await.unwrap();
    assert_eq!(record.transactions().len(), 1);

    // Selling everything actually held still works.
    let reply = router
        .handle(
            "erin",
            UserEvent::Action(Action::SellAll {
                token_address: MINT.to_string(),
            }),
        )
        .await;
    assert!(reply.text.contains("Sold 50"), "{}", reply.text);

    let record = store.load("erin").await.unwrap();
    assert_eq!(record.transactions().len(), 2);
    assert_eq!(record.transactions()[1].kind, TradeKind::Sell);
}

#[tokio::test]
async fn dust_sell_below_smallest_unit_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let (store, gateway, router) = harness(dir.path());
    gateway.set_token(MINT, "TOK", 6, dec!(3));
    with_wallet(&router, "frank").await;

    router
        .handle(
            "frank",
            UserEvent::Action(Action::Buy {
                token_address: MINT.to_string(),
                sol_amount: dec!(1),
            }),
        )
        .await;

    router
        .handle(
            "frank",
            UserEvent::Action(Action::SellCustom {
                token_address: MINT.to_string(),
            }),
        )
        .await;
    let reply = router
        .handle("frank", UserEvent::Text("0.0000001".to_string()))
        .await;
    assert!(
        reply.text.contains("smallest representable unit"),
        "{}",
        reply.text
    );
    assert_eq!(store.load("frank").await.unwrap().transactions().len(), 1);
}

#[tokio::test]
async fn pnl_report_values_the_position_from_the_ledger() {
    let dir = tempfile::tempdir().unwrap();
    let (_, gateway, router) = harness(dir.path());
    with_wallet(&router, "grace").await;

    // First buy at 0.01 SOL/token: 1 SOL -> 100 tokens.
    gateway.set_token(MINT, "TOK", 6, dec!(1.5));
    router
        .handle(
            "grace",
            UserEvent::Action(Action::Buy {
                token_address: MINT.to_string(),
                sol_amount: dec!(1),
            }),
        )
        .await;

    // Second buy at 0.03 SOL/token: 3 SOL -> 100 tokens.
    gateway.set_token(MINT, "TOK", 6, dec!(4.5));
    router
        .handle(
            "grace",
            UserEvent::Action(Action::Buy {
                token_address: MINT.to_string(),
                sol_amount: dec!(3),
            }),
        )
        .await;

    // 200 tokens at 0.03 SOL each = 6 SOL against 4 SOL spent: +2 SOL, +50%.
    let reply = router
        .handle(
            "grace",
            UserEvent::Action(Action::Position {
                token_address: MINT.to_string(),
            }),
        )
        .await;
    assert!(reply.text.contains("holding 200"), "{}", reply.text);
    assert!(reply.text.contains("(50%)"), "{}", reply.text);
}

#[tokio::test]
async fn pnl_degrades_when_the_gateway_is_down() {
    let dir = tempfile::tempdir().unwrap();
    let (_, gateway, router) = harness(dir.path());
    gateway.set_token(MINT, "TOK", 6, dec!(3));
    with_wallet(&router, "heidi").await;
    router
        .handle(
            "heidi",
            UserEvent::Action(Action::Buy {
                token_address: MINT.to_string(),
                sol_amount: dec!(1),
            }),
        )
        .await;

    gateway.go_down();
    let reply = router
        .handle(
            "heidi",
            UserEvent::Action(Action::Position {
                token_address: MINT.to_string(),
            }),
        )
        .await;
    assert!(reply.text.starts_with("PnL unavailable"), "{}", reply.text);
}

#[tokio::test]
async fn wallet_import_flow_persists_the_imported_key() {
    let dir = tempfile::tempdir().unwrap();
    let (_, _, router) = harness(dir.path());

    let source = Wallet::generate();
    let secret = source.secret_material.expose_secret().to_string();

    let reply = router
        .handle("ivan", UserEvent::Action(Action::ImportWallet))
        .await;
    assert!(reply.text.contains("private key"), "{}", reply.text);

    let reply = router.handle("ivan", UserEvent::Text(secret)).await;
    assert!(reply.text.contains(&source.public_key), "{}", reply.text);

    let store = open_store(dir.path());
    let record = store.load("ivan").await.unwrap();
    let wallet = record.wallet.expect("imported wallet persisted");
    assert_eq!(wallet.public_key, source.public_key);
    assert!(wallet.signing_key().is_some());
}

#[tokio::test]
async fn trading_without_a_wallet_is_refused() {
    let dir = tempfile::tempdir().unwrap();
    let (store, gateway, router) = harness(dir.path());
    gateway.set_token(MINT, "TOK", 6, dec!(3));

    let reply = router
        .handle(
            "judy",
            UserEvent::Action(Action::Buy {
                token_address: MINT.to_string(),
                sol_amount: dec!(1),
            }),
        )
        .await;
    assert!(reply.text.contains("No wallet"), "{}", reply.text);
    assert!(store.load("judy").await.unwrap().transactions().is_empty());
}

#[tokio::test]
async fn token_lookup_offers_buy_menu_and_degrades_without_metadata() {
    let dir = tempfile::tempdir().unwrap();
    let (_, gateway, router) = harness(dir.path());
    gateway.set_token(MINT, "TOK", 6, dec!(3));

    let reply = router.handle("kim", UserEvent::Text(MINT.to_string())).await;
    assert!(reply.text.contains("TOK"), "{}", reply.text);
    assert!(reply.menu.iter().any(|b| b.label == "Buy custom"));

    // Unknown mint: explicit unavailability, buy menu still offered.
    let other = "3yFwqXBfZY4jBVUafQ1YEXw189y2dN3V5KQq9uzBDy1E";
    let reply = router
        .handle("kim", UserEvent::Text(other.to_string()))
        .await;
    assert!(reply.text.contains("Metadata unavailable"), "{}", reply.text);
    assert!(!reply.menu.is_empty());
}
