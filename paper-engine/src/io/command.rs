//! JSON-line command interface.
//!
//! One request per line, e.g.
//! `{"cmd": "PLACE", "symbol": "AAPL", "side": "buy", "price": 10.0, "quantity": 5}`.
//! Every request gets one JSON object back with `status` set to `OK` or `ERROR`.

use crate::engine::PaperTrader;
use crate::error::PaperError;
use log::{error, info};
use paper_api::{Instrument, OrderId, Side, SideFilter, Symbol};
use serde::Deserialize;
use serde_json::{json, Value};

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "cmd", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TraderCommand {
    /// Limit order. `exchange` and `currency` register an instrument the trader does not know yet.
    Place {
        symbol: Symbol,
        side: Side,
        price: f64,
        quantity: f64,
        #[serde(default)]
        exchange: Option<String>,
        #[serde(default)]
        currency: Option<String>,
    },
    Market {
        symbol: Symbol,
        side: Side,
        quantity: f64,
    },
    Modify {
        symbol: Symbol,
        #[serde(default)]
        side: SideFilter,
        steps: f64,
    },
    Cancel {
        id: OrderId,
    },
    CancelAll {
        symbol: Symbol,
        #[serde(default)]
        side: SideFilter,
    },
    Balances,
    Positions,
    State,
    Ping,
}

fn rejected(e: PaperError) -> Value {
    json!({"status": "ERROR", "code": e.code(), "msg": e.to_string()})
}

fn resolve_instrument(
    trader: &PaperTrader,
    symbol: &Symbol,
    exchange: Option<String>,
    currency: Option<String>,
) -> Result<Instrument, PaperError> {
    if let Some(instrument) = trader.instrument(symbol) {
        return Ok(instrument);
    }
    match currency {
        Some(currency) => Ok(Instrument::new(
            symbol.clone(),
            exchange.unwrap_or_default(),
            currency,
        )),
        None => Err(PaperError::UnknownInstrument(symbol.clone())),
    }
}

/// Parses and runs one request line.
pub async fn handle_command(trader: &PaperTrader, line: &str) -> Value {
    let command: TraderCommand = match serde_json::from_str(line) {
        Ok(command) => command,
        Err(e) => {
            return json!({"status": "ERROR", "code": "INVALID_COMMAND", "msg": format!("Invalid command: {}", e)})
        }
    };
    info!("Command: {:?}", command);

    match command {
        TraderCommand::Place {
            symbol,
            side,
            price,
            quantity,
            exchange,
            currency,
        } => {
            let instrument = match resolve_instrument(trader, &symbol, exchange, currency) {
                Ok(instrument) => instrument,
                Err(e) => return rejected(e),
            };
            match trader.place_limit_order(&instrument, price, quantity, side).await {
                Ok(order) => json!({"status": "OK", "order": order}),
                Err(e) => {
                    error!("Placing {} {} failed: {}", side, symbol, e);
                    rejected(e)
                }
            }
        }
        TraderCommand::Market {
            symbol,
            side,
            quantity,
        } => {
            let instrument = trader
                .instrument(&symbol)
                .unwrap_or_else(|| Instrument::new(symbol.clone(), "", ""));
            match trader.place_market_order(&instrument, quantity, side) {
                Ok(order) => json!({"status": "OK", "order": order}),
                Err(e) => rejected(e),
            }
        }
        TraderCommand::Modify {
            symbol,
            side,
            steps,
        } => match trader.modify_orders(&symbol, side, steps).await {
            Ok(modified) => json!({"status": "OK", "modified": modified}),
            Err(e) => rejected(e),
        },
        TraderCommand::Cancel { id } => match trader.cancel(id).await {
            Ok(canceled) => json!({"status": "OK", "canceled": canceled}),
            Err(e) => rejected(e),
        },
        TraderCommand::CancelAll { symbol, side } => match trader.cancel_all(&symbol, side).await {
            Ok(canceled) => json!({"status": "OK", "canceled": canceled}),
            Err(e) => rejected(e),
        },
        TraderCommand::Balances => {
            trader.publish_balances();
            json!({"status": "OK", "balances": trader.balances()})
        }
        TraderCommand::Positions => {
            trader.publish_positions();
            json!({"status": "OK", "positions": trader.positions()})
        }
        TraderCommand::State => json!({"status": "OK", "state": trader.export()}),
        TraderCommand::Ping => json!({"status": "OK", "msg": "PONG"}),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::ScriptedFeed;
    use crate::io::publisher::RecordingPublisher;
    use crate::models::PaperConfig;
    use paper_api::{BookLevel, CommissionCalculator, CommissionError, OrderBookSnapshot};
    use std::sync::Arc;

    fn no_fee(_: &Instrument, _: f64, _: f64) -> Result<f64, CommissionError> {
        Ok(0.0)
    }

    fn trader() -> Arc<PaperTrader> {
        let config = PaperConfig::default()
            .with_deposit("USD", 1_000.0)
            .with_instrument(Instrument::new("AAPL", "NASDAQ", "USD"));
        let feed = ScriptedFeed::new().with_book(
            "AAPL",
            OrderBookSnapshot::new(vec![BookLevel::new(9.9, 10.0)], vec![BookLevel::new(10.0, 10.0)]),
        );
        let commission: Arc<dyn CommissionCalculator> = Arc::new(no_fee);
        let trader = PaperTrader::new(&config, Arc::new(feed), commission, Arc::new(RecordingPublisher::new()));
        trader.spawn_feed();
        trader
    }

    #[tokio::test]
    async fn test_ping_and_invalid_json() {
        let trader = trader();
        assert_eq!(handle_command(&trader, r#"{"cmd": "PING"}"#).await["msg"], "PONG");

        let response = handle_command(&trader, "not json").await;
        assert_eq!(response["status"], "ERROR");
        assert_eq!(response["code"], "INVALID_COMMAND");
    }

    #[tokio::test]
    async fn test_market_command_is_rejected() {
        let trader = trader();
        let response = handle_command(
            &trader,
            r#"{"cmd": "MARKET", "symbol": "AAPL", "side": "buy", "quantity": 1}"#,
        )
        .await;
        assert_eq!(response["status"], "ERROR");
        assert_eq!(response["code"], "MARKET_ORDERS_DISABLED");
    }

    #[tokio::test]
    async fn test_place_fills_and_updates_balances() {
        let trader = trader();
        let response = handle_command(
            &trader,
            r#"{"cmd": "PLACE", "symbol": "AAPL", "side": "buy", "price": 10.0, "quantity": 5}"#,
        )
        .await;
        assert_eq!(response["status"], "OK");
        assert_eq!(response["order"]["status"], "filled");

        let balances = handle_command(&trader, r#"{"cmd": "BALANCES"}"#).await;
        assert_eq!(balances["balances"]["USD"], 950.0);
    }

    #[tokio::test]
    async fn test_place_unknown_instrument_needs_currency() {
        let trader = trader();
        let response = handle_command(
            &trader,
            r#"{"cmd": "PLACE", "symbol": "MSFT", "side": "buy", "price": 10.0, "quantity": 1}"#,
        )
        .await;
        assert_eq!(response["code"], "UNKNOWN_INSTRUMENT");

        let response = handle_command(&trader, r#"{"cmd": "CANCEL", "id": 42}"#).await;
        assert_eq!(response["code"], "UNKNOWN_ORDER");
    }

    #[tokio::test]
    async fn test_cancel_all_resting_orders() {
        let trader = trader();
        for line in [
            r#"{"cmd": "PLACE", "symbol": "AAPL", "side": "buy", "price": 9.0, "quantity": 1}"#,
            r#"{"cmd": "PLACE", "symbol": "AAPL", "side": "sell", "price": 11.0, "quantity": 1}"#,
        ] {
            assert_eq!(handle_command(&trader, line).await["order"]["status"], "working");
        }

        let response = handle_command(&trader, r#"{"cmd": "CANCEL_ALL", "symbol": "AAPL", "side": "sell"}"#).await;
        assert_eq!(response["canceled"], 1);
        let response = handle_command(&trader, r#"{"cmd": "CANCEL_ALL", "symbol": "AAPL"}"#).await;
        assert_eq!(response["canceled"], 1);

        let state = handle_command(&trader, r#"{"cmd": "STATE"}"#).await;
        assert_eq!(state["state"]["orders"].as_array().unwrap().len(), 0);
    }
}
