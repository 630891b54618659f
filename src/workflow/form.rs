//! Decoding of flat form submissions into workflow commands.
//!
//! Adjustment forms post one field per detail line (`<line id> = <quantity>`). Purchase
//! forms post two fields per line, `PURCHASE-<id>-<code>` and `RECEIVE-<id>-<code>`.
//! Both carry the requested action in `submit_type`; `DEL-<id>` deletes a line.

use std::collections::{BTreeMap, HashMap};

use super::WorkflowError;

pub const SUBMIT_TYPE: &str = "submit_type";

const DELETE_PREFIX: &str = "DEL-";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdjustmentAction {
    LoadProducts,
    Save,
    Apply,
    DeleteLine(i64),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdjustmentSubmission {
    pub action: AdjustmentAction,
    /// Line id to staged quantity.
    pub updates: BTreeMap<i64, i32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PurchaseAction {
    LoadProducts,
    Save,
    Start,
    Receive,
    Apply,
    Export,
    DeleteLine(i64),
}

/// One purchase line as submitted: the PURCHASE field merged with its RECEIVE field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PurchaseLineInput {
    pub id: i64,
    pub prod_code: String,
    pub purch_qty: i32,
    pub receive_qty: i32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PurchaseSubmission {
    pub action: PurchaseAction,
    pub lines: Vec<PurchaseLineInput>,
}

pub fn decode_adjustment(
    payload: &HashMap<String, String>,
) -> Result<AdjustmentSubmission, WorkflowError> {
    let action = match submit_type(payload)? {
        "load_products" => AdjustmentAction::LoadProducts,
        "save_adjustment" => AdjustmentAction::Save,
        "apply_adjustment" => AdjustmentAction::Apply,
        other => AdjustmentAction::DeleteLine(parse_delete(other)?),
    };
    let updates = decode_adjustment_lines(payload)?;
    Ok(AdjustmentSubmission { action, updates })
}

/// Every key except `submit_type` is a line id.
pub fn decode_adjustment_lines(
    payload: &HashMap<String, String>,
) -> Result<BTreeMap<i64, i32>, WorkflowError> {
    payload
        .iter()
        .filter(|(key, _)| key.as_str() != SUBMIT_TYPE)
        .map(|(key, value)| Ok::<_, WorkflowError>((parse_id(key, key)?, parse_quantity(key, value)?)))
        .collect()
}

pub fn decode_purchase(
    payload: &HashMap<String, String>,
) -> Result<PurchaseSubmission, WorkflowError> {
    let action = match submit_type(payload)? {
        "load_products" => PurchaseAction::LoadProducts,
        "save_purchase" => PurchaseAction::Save,
        "start_purchase" => PurchaseAction::Start,
        "receive_purchase" => PurchaseAction::Receive,
        "apply_purchase" => PurchaseAction::Apply,
        "export_purchase" => PurchaseAction::Export,
        other => PurchaseAction::DeleteLine(parse_delete(other)?),
    };
    let lines = decode_purchase_lines(payload)?;
    Ok(PurchaseSubmission { action, lines })
}

#[derive(Default)]
struct PendingLine {
    purchase: Option<i32>,
    receive: Option<i32>,
}

/// Groups `ACTION-id-code` fields by (id, code). A RECEIVE field without a PURCHASE
/// field for the same pair is dropped.
pub fn decode_purchase_lines(
    payload: &HashMap<String, String>,
) -> Result<Vec<PurchaseLineInput>, WorkflowError> {
    let mut grouped: BTreeMap<(i64, String), PendingLine> = BTreeMap::new();

    for (key, value) in payload {
        if key == SUBMIT_TYPE {
            continue;
        }
        let mut parts = key.splitn(3, '-');
        let (Some(field), Some(id), Some(code)) = (parts.next(), parts.next(), parts.next())
        else {
            return Err(WorkflowError::malformed(format!(
                "key '{key}' must look like ACTION-id-code"
            )));
        };
        if code.is_empty() {
            return Err(WorkflowError::malformed(format!(
                "key '{key}' has an empty product code"
            )));
        }
        let id = parse_id(key, id)?;
        let quantity = parse_quantity(key, value)?;
        let entry = grouped.entry((id, code.to_string())).or_default();
        match field {
            "PURCHASE" => entry.purchase = Some(quantity),
            "RECEIVE" => entry.receive = Some(quantity),
            other => {
                return Err(WorkflowError::malformed(format!(
                    "key '{key}' has unknown field '{other}'"
                )))
            }
        }
    }

    Ok(grouped
        .into_iter()
        .filter_map(|((id, prod_code), pending)| {
            pending.purchase.map(|purch_qty| PurchaseLineInput {
                id,
                prod_code,
                purch_qty,
                receive_qty: pending.receive.unwrap_or(0),
            })
        })
        .collect())
}

fn submit_type(payload: &HashMap<String, String>) -> Result<&str, WorkflowError> {
    payload
        .get(SUBMIT_TYPE)
        .map(|s| s.trim())
        .ok_or_else(|| WorkflowError::malformed("missing submit_type"))
}

fn parse_delete(submit_type: &str) -> Result<i64, WorkflowError> {
    let id = submit_type.strip_prefix(DELETE_PREFIX).ok_or_else(|| {
        WorkflowError::malformed(format!("unknown submit_type '{submit_type}'"))
    })?;
    parse_id(SUBMIT_TYPE, id)
}

fn parse_id(key: &str, raw: &str) -> Result<i64, WorkflowError> {
    raw.trim()
        .parse::<i64>()
        .ok()
        .filter(|id| *id > 0)
        .ok_or_else(|| WorkflowError::malformed(format!("key '{key}' has an invalid line id")))
}

fn parse_quantity(key: &str, raw: &str) -> Result<i32, WorkflowError> {
    raw.trim()
        .parse::<i32>()
        .map_err(|_| WorkflowError::malformed(format!("value for '{key}' is not an integer")))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn purchase_and_receive_fields_merge_into_one_line() {
        let submission = decode_purchase(&payload(&[
            ("PURCHASE-5-ABC", "10"),
            ("RECEIVE-5-ABC", "3"),
            ("submit_type", "save_purchase"),
        ]))
        .unwrap();

        assert_eq!(submission.action, PurchaseAction::Save);
        assert_eq!(
            submission.lines,
            vec![PurchaseLineInput {
                id: 5,
                prod_code: "ABC".to_string(),
                purch_qty: 10,
                receive_qty: 3,
            }]
        );
    }

    #[test]
    fn receive_without_purchase_is_dropped() {
        let lines = decode_purchase_lines(&payload(&[("RECEIVE-5-ABC", "3")])).unwrap();
        assert!(lines.is_empty());
    }

    #[test]
    fn receive_defaults_to_zero() {
        let lines = decode_purchase_lines(&payload(&[
            ("PURCHASE-7-KPKB", "20"),
            ("RECEIVE-8-KPKB", "4"),
        ]))
        .unwrap();

        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].id, 7);
        assert_eq!(lines[0].receive_qty, 0);
    }

    #[test]
    fn product_codes_may_contain_dashes() {
        let lines = decode_purchase_lines(&payload(&[
            ("PURCHASE-2-CF-500", "1"),
            ("RECEIVE-2-CF-500", "1"),
        ]))
        .unwrap();

        assert_eq!(lines[0].prod_code, "CF-500");
        assert_eq!(lines[0].receive_qty, 1);
    }

    #[test]
    fn malformed_purchase_keys_fail_the_whole_decode() {
        for bad in [
            ("PURCHASE-5", "1"),
            ("PURCHASE-x-ABC", "1"),
            ("ORDER-5-ABC", "1"),
            ("PURCHASE-5-", "1"),
            ("PURCHASE-5-ABC", "ten"),
        ] {
            let result = decode_purchase_lines(&payload(&[bad, ("PURCHASE-6-OK", "2")]));
            assert!(
                matches!(result, Err(WorkflowError::MalformedPayload(_))),
                "{bad:?} should be rejected"
            );
        }
    }

    #[test]
    fn adjustment_keys_are_line_ids() {
        let submission = decode_adjustment(&payload(&[
            ("3", "12"),
            ("4", "-2"),
            ("submit_type", "apply_adjustment"),
        ]))
        .unwrap();

        assert_eq!(submission.action, AdjustmentAction::Apply);
        assert_eq!(submission.updates, BTreeMap::from([(3, 12), (4, -2)]));
    }

    #[test]
    fn adjustment_rejects_non_numeric_keys() {
        let result = decode_adjustment(&payload(&[
            ("abc", "12"),
            ("submit_type", "save_adjustment"),
        ]));
        assert!(matches!(result, Err(WorkflowError::MalformedPayload(_))));
    }

    #[test]
    fn delete_discriminator_carries_line_id() {
        let submission = decode_adjustment(&payload(&[("submit_type", "DEL-42")])).unwrap();
        assert_eq!(submission.action, AdjustmentAction::DeleteLine(42));

        let submission = decode_purchase(&payload(&[("submit_type", "DEL-9")])).unwrap();
        assert_eq!(submission.action, PurchaseAction::DeleteLine(9));

        assert!(decode_purchase(&payload(&[("submit_type", "DEL-")])).is_err());
    }

    #[test]
    fn missing_or_unknown_submit_type_is_malformed() {
        assert!(decode_adjustment(&payload(&[("1", "2")])).is_err());
        assert!(decode_purchase(&payload(&[("submit_type", "ship_it")])).is_err());
    }
}
