//! Wire types for the real-time feed.
//!
//! Outbound commands are `{id, cmd, params}`; inbound frames carry a
//! `type` discriminator, an optional command `id` (acks), a subscription
//! `sid`, and a per-book-message sequence number `seq`.

use crate::domain::enums::{Action, Side};
use feedsock::{FeedSockError, MessageDecoder, WsMessage};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

/// Feed channels the venue offers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Channel {
    Ticker,
    OrderbookDelta,
    Trade,
    Fill,
}

impl Channel {
    pub fn as_str(self) -> &'static str {
        match self {
            Channel::Ticker => "ticker",
            Channel::OrderbookDelta => "orderbook_delta",
            Channel::Trade => "trade",
            Channel::Fill => "fill",
        }
    }
}

/// Outbound control message
#[derive(Debug, Serialize)]
pub struct Command {
    pub id: u64,
    pub cmd: &'static str,
    pub params: CommandParams,
}

#[derive(Debug, Default, Serialize)]
pub struct CommandParams {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub channels: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub market_tickers: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sids: Option<Vec<u64>>,
}

impl Command {
    /// Subscribe to one channel for a set of markets (empty set for
    /// account-wide channels like fills)
    pub fn subscribe(id: u64, channel: Channel, tickers: &[String]) -> Self {
        Self {
            id,
            cmd: "subscribe",
            params: CommandParams {
                channels: Some(vec![channel.as_str().to_string()]),
                market_tickers: if tickers.is_empty() {
                    None
                } else {
                    Some(tickers.to_vec())
                },
                sids: None,
            },
        }
    }

    pub fn unsubscribe(id: u64, sids: Vec<u64>) -> Self {
        Self {
            id,
            cmd: "unsubscribe",
            params: CommandParams {
                channels: None,
                market_tickers: None,
                sids: Some(sids),
            },
        }
    }

    pub fn to_ws_message(&self) -> WsMessage {
        WsMessage::Text(serde_json::to_string(self).unwrap())
    }
}

// --- Inbound messages ---

#[derive(Debug, Clone, Deserialize)]
pub struct TickerUpdate {
    pub market_ticker: String,
    pub yes_bid: Option<i64>,
    pub yes_ask: Option<i64>,
    pub price: Option<i64>,
    pub volume: Option<i64>,
    pub open_interest: Option<i64>,
    pub ts: Option<i64>,
}

/// Full replacement of one market's book
#[derive(Debug, Clone, Deserialize)]
pub struct BookSnapshot {
    #[serde(default)]
    pub seq: u64,
    pub market_ticker: String,
    #[serde(default)]
    pub yes: Vec<(i64, i64)>,
    #[serde(default)]
    pub no: Vec<(i64, i64)>,
}

/// Signed quantity change to one price level of one market's book
#[derive(Debug, Clone, Deserialize)]
pub struct BookDelta {
    #[serde(default)]
    pub seq: u64,
    pub market_ticker: String,
    pub price: i64,
    /// Signed change; the level is removed when it reaches zero
    pub delta: i64,
    pub side: Side,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TradeUpdate {
    pub market_ticker: String,
    pub yes_price: Option<i64>,
    pub no_price: Option<i64>,
    pub count: i64,
    pub taker_side: Option<Side>,
    pub ts: Option<i64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FillUpdate {
    pub market_ticker: String,
    pub trade_id: Option<String>,
    pub order_id: Option<String>,
    pub side: Option<Side>,
    pub action: Option<Action>,
    pub count: i64,
    pub yes_price: Option<i64>,
    pub no_price: Option<i64>,
    pub is_taker: Option<bool>,
    pub ts: Option<i64>,
}

/// A decoded feed message
#[derive(Debug, Clone)]
pub enum FeedMessage {
    /// Server acknowledged a subscribe command
    Subscribed {
        id: u64,
        sid: u64,
        channel: String,
    },
    /// Server rejected a command
    CommandError {
        id: u64,
        code: Option<i64>,
        message: String,
    },
    /// Server confirmed an unsubscribe
    Unsubscribed { sid: u64 },
    Ticker(TickerUpdate),
    Snapshot(BookSnapshot),
    Delta(BookDelta),
    Trade(TradeUpdate),
    Fill(FillUpdate),
}

#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(rename = "type")]
    msg_type: String,
    id: Option<u64>,
    sid: Option<u64>,
    seq: Option<u64>,
    #[serde(default)]
    msg: Value,
}

#[derive(Debug, Deserialize)]
struct AckPayload {
    channel: Option<String>,
    sid: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct ErrorPayload {
    code: Option<i64>,
    msg: Option<String>,
}

/// Decodes venue frames into [`FeedMessage`]s.
///
/// Unrecognized discriminators are logged and dropped; they are never
/// fatal to the connection.
pub struct KalshiDecoder;

impl MessageDecoder for KalshiDecoder {
    type Frame = FeedMessage;

    fn decode(&self, message: WsMessage) -> feedsock::Result<Option<FeedMessage>> {
        let Some(text) = message.as_text() else {
            return Ok(None);
        };

        let envelope: Envelope =
            serde_json::from_str(text).map_err(|e| FeedSockError::Decode(e.to_string()))?;

        let decoded = match envelope.msg_type.as_str() {
            "subscribed" => {
                let ack: AckPayload = serde_json::from_value(envelope.msg)
                    .map_err(|e| FeedSockError::Decode(e.to_string()))?;
                FeedMessage::Subscribed {
                    id: envelope.id.unwrap_or(0),
                    sid: ack.sid.or(envelope.sid).unwrap_or(0),
                    channel: ack.channel.unwrap_or_default(),
                }
            }
            "error" => {
                let payload: ErrorPayload =
                    serde_json::from_value(envelope.msg).unwrap_or(ErrorPayload {
                        code: None,
                        msg: None,
                    });
                FeedMessage::CommandError {
                    id: envelope.id.unwrap_or(0),
                    code: payload.code,
                    message: payload.msg.unwrap_or_else(|| "Unknown error".to_string()),
                }
            }
            "unsubscribed" => FeedMessage::Unsubscribed {
                sid: envelope.sid.unwrap_or(0),
            },
            "ticker" | "ticker_v2" => FeedMessage::Ticker(
                serde_json::from_value(envelope.msg)
                    .map_err(|e| FeedSockError::Decode(e.to_string()))?,
            ),
            "orderbook_snapshot" => {
                let mut snapshot: BookSnapshot = serde_json::from_value(envelope.msg)
                    .map_err(|e| FeedSockError::Decode(e.to_string()))?;
                if let Some(seq) = envelope.seq {
                    snapshot.seq = seq;
                }
                FeedMessage::Snapshot(snapshot)
            }
            "orderbook_delta" => {
                let mut delta: BookDelta = serde_json::from_value(envelope.msg)
                    .map_err(|e| FeedSockError::Decode(e.to_string()))?;
                if let Some(seq) = envelope.seq {
                    delta.seq = seq;
                }
                FeedMessage::Delta(delta)
            }
            "trade" => FeedMessage::Trade(
                serde_json::from_value(envelope.msg)
                    .map_err(|e| FeedSockError::Decode(e.to_string()))?,
            ),
            "fill" => FeedMessage::Fill(
                serde_json::from_value(envelope.msg)
                    .map_err(|e| FeedSockError::Decode(e.to_string()))?,
            ),
            other => {
                debug!("Ignoring unknown feed message type: {}", other);
                return Ok(None);
            }
        };

        Ok(Some(decoded))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode(text: &str) -> Option<FeedMessage> {
        KalshiDecoder
            .decode(WsMessage::Text(text.to_string()))
            .unwrap()
    }

    #[test]
    fn subscribe_command_serializes_without_empty_fields() {
        let cmd = Command::subscribe(3, Channel::OrderbookDelta, &["KXBTC-25DEC31".to_string()]);
        let text = serde_json::to_string(&cmd).unwrap();

        assert!(text.contains("\"id\":3"));
        assert!(text.contains("\"cmd\":\"subscribe\""));
        assert!(text.contains("\"orderbook_delta\""));
        assert!(text.contains("KXBTC-25DEC31"));
        assert!(!text.contains("sids"));
    }

    #[test]
    fn account_wide_subscribe_omits_tickers() {
        let cmd = Command::subscribe(1, Channel::Fill, &[]);
        let text = serde_json::to_string(&cmd).unwrap();
        assert!(!text.contains("market_tickers"));
    }

    #[test]
    fn ack_decodes_with_sid_from_payload() {
        let msg = decode(r#"{"id":2,"type":"subscribed","msg":{"channel":"ticker","sid":7}}"#);
        match msg {
            Some(FeedMessage::Subscribed { id, sid, channel }) => {
                assert_eq!((id, sid, channel.as_str()), (2, 7, "ticker"));
            }
            other => panic!("expected ack, got {:?}", other),
        }
    }

    #[test]
    fn snapshot_takes_seq_from_envelope() {
        let msg = decode(
            r#"{"type":"orderbook_snapshot","sid":7,"seq":10,
                "msg":{"market_ticker":"KXBTC-25DEC31","yes":[[50,100]],"no":[[40,80]]}}"#,
        );
        match msg {
            Some(FeedMessage::Snapshot(snapshot)) => {
                assert_eq!(snapshot.seq, 10);
                assert_eq!(snapshot.market_ticker, "KXBTC-25DEC31");
                assert_eq!(snapshot.yes, vec![(50, 100)]);
                assert_eq!(snapshot.no, vec![(40, 80)]);
            }
            other => panic!("expected snapshot, got {:?}", other),
        }
    }

    #[test]
    fn delta_decodes_signed_change() {
        let msg = decode(
            r#"{"type":"orderbook_delta","sid":7,"seq":11,
                "msg":{"market_ticker":"KXBTC-25DEC31","price":50,"delta":-40,"side":"yes"}}"#,
        );
        match msg {
            Some(FeedMessage::Delta(delta)) => {
                assert_eq!(delta.seq, 11);
                assert_eq!(delta.price, 50);
                assert_eq!(delta.delta, -40);
                assert_eq!(delta.side, Side::Yes);
            }
            other => panic!("expected delta, got {:?}", other),
        }
    }

    #[test]
    fn unknown_type_is_dropped_not_fatal() {
        let msg = decode(r#"{"type":"maintenance_notice","msg":{"note":"soon"}}"#);
        assert!(msg.is_none());
    }

    #[test]
    fn garbage_json_is_a_decode_error() {
        let result = KalshiDecoder.decode(WsMessage::Text("not json".to_string()));
        assert!(result.is_err());
    }

    #[test]
    fn error_frame_decodes() {
        let msg = decode(r#"{"id":4,"type":"error","msg":{"code":6,"msg":"Already subscribed"}}"#);
        match msg {
            Some(FeedMessage::CommandError { id, code, message }) => {
                assert_eq!((id, code), (4, Some(6)));
                assert_eq!(message, "Already subscribed");
            }
            other => panic!("expected error, got {:?}", other),
        }
    }
}
