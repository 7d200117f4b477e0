//! Redirect bank gateway: signed payment URLs and return verification.
//!
//! Parameters are sorted by name, form-encoded, and signed with
//! HMAC-SHA512 over the encoded query. The return leg is trusted only if
//! its signature verifies under the same secret.

use crate::config::GatewayConfig;
use crate::ids::{CartId, StoreId};
use chrono::{DateTime, FixedOffset, Utc};
use hmac::{Hmac, Mac};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sha2::Sha512;
use std::collections::{BTreeMap, HashMap};
use thiserror::Error;
use url::Url;

type HmacSha512 = Hmac<Sha512>;

const VERSION: &str = "2.1.0";
const COMMAND: &str = "pay";
const CURRENCY: &str = "VND";
const ORDER_TYPE: &str = "other";
const SUCCESS_CODE: &str = "00";
/// Gateway timestamps are Vietnam local time.
const GATEWAY_UTC_OFFSET_SECS: i32 = 7 * 3600;

/// Redirect gateway failures.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum GatewayError {
    #[error("payment gateway is not configured: {0}")]
    NotConfigured(&'static str),

    #[error("invalid return url: {0}")]
    InvalidReturnUrl(String),

    #[error("gateway return is missing {0}")]
    MissingField(&'static str),

    #[error("gateway return signature does not match")]
    InvalidSignature,

    #[error("gateway return carries an invalid amount: {0}")]
    InvalidAmount(String),
}

/// What to ask the gateway to collect.
#[derive(Debug, Clone)]
pub struct GatewayPaymentRequest {
    /// Correlation id, echoed back on return.
    pub txn_ref: String,
    /// Amount in VND.
    pub amount: Decimal,
    pub cart_id: CartId,
    pub store_id: StoreId,
    pub created_at: DateTime<Utc>,
}

/// A verified gateway return.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GatewayReturn {
    pub txn_ref: String,
    /// Amount in VND.
    pub amount: Decimal,
    pub response_code: String,
    pub transaction_status: Option<String>,
    pub transaction_no: Option<String>,
    pub bank_code: Option<String>,
}

impl GatewayReturn {
    /// Whether the gateway reports that the buyer paid.
    pub fn is_success(&self) -> bool {
        self.response_code == SUCCESS_CODE
            && self
                .transaction_status
                .as_deref()
                .map_or(true, |s| s == SUCCESS_CODE)
    }
}

/// Builds and verifies gateway redirects.
#[derive(Debug, Clone)]
pub struct RedirectGateway {
    config: GatewayConfig,
}

impl RedirectGateway {
    pub fn new(config: GatewayConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    /// Build the signed URL the buyer is sent to.
    pub fn build_payment_url(&self, request: &GatewayPaymentRequest) -> Result<String, GatewayError> {
        self.ensure_configured()?;

        let return_url = self.return_url(&request.cart_id, &request.store_id)?;
        let offset = FixedOffset::east_opt(GATEWAY_UTC_OFFSET_SECS)
            .ok_or(GatewayError::NotConfigured("gateway time zone"))?;
        let create_date = request
            .created_at
            .with_timezone(&offset)
            .format("%Y%m%d%H%M%S")
            .to_string();

        let mut params = BTreeMap::new();
        params.insert("vnp_Version", VERSION.to_string());
        params.insert("vnp_Command", COMMAND.to_string());
        params.insert("vnp_TmnCode", self.config.tmn_code.clone());
        params.insert("vnp_Amount", minor_units(request.amount).to_string());
        params.insert("vnp_CurrCode", CURRENCY.to_string());
        params.insert("vnp_TxnRef", request.txn_ref.clone());
        params.insert(
            "vnp_OrderInfo",
            format!("Thanh toan cho ma GD: {}", request.txn_ref),
        );
        params.insert("vnp_OrderType", ORDER_TYPE.to_string());
        params.insert("vnp_Locale", self.config.locale.clone());
        params.insert("vnp_ReturnUrl", return_url);
        params.insert("vnp_IpAddr", self.config.ip_addr.clone());
        params.insert("vnp_CreateDate", create_date);

        let query = encode_sorted(params.iter().map(|(k, v)| (*k, v.as_str())));
        let signature = self.sign(&query)?;

        Ok(format!(
            "{}{}?{}&vnp_SecureHash={}",
            self.config.host.trim_end_matches('/'),
            self.config.payment_path,
            query,
            signature
        ))
    }

    /// Verify a return query and extract its fields.
    ///
    /// A verified return may still report a failed payment; check
    /// [`GatewayReturn::is_success`].
    pub fn verify_return(&self, query: &HashMap<String, String>) -> Result<GatewayReturn, GatewayError> {
        self.ensure_configured()?;

        let provided = query
            .get("vnp_SecureHash")
            .ok_or(GatewayError::MissingField("vnp_SecureHash"))?;

        let signed: BTreeMap<&str, &str> = query
            .iter()
            .filter(|(k, v)| {
                k.starts_with("vnp_")
                    && *k != "vnp_SecureHash"
                    && *k != "vnp_SecureHashType"
                    && !v.is_empty()
            })
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .collect();

        let expected = self.sign(&encode_sorted(signed.into_iter()))?;
        if !constant_time_eq(&expected, &provided.to_ascii_lowercase()) {
            return Err(GatewayError::InvalidSignature);
        }

        let field = |name: &'static str| {
            query
                .get(name)
                .filter(|v| !v.is_empty())
                .cloned()
                .ok_or(GatewayError::MissingField(name))
        };

        let raw_amount = field("vnp_Amount")?;
        let amount = raw_amount
            .parse::<Decimal>()
            .map_err(|_| GatewayError::InvalidAmount(raw_amount.clone()))?
            / Decimal::ONE_HUNDRED;

        Ok(GatewayReturn {
            txn_ref: field("vnp_TxnRef")?,
            amount,
            response_code: field("vnp_ResponseCode")?,
            transaction_status: field("vnp_TransactionStatus").ok(),
            transaction_no: field("vnp_TransactionNo").ok(),
            bank_code: field("vnp_BankCode").ok(),
        })
    }

    fn return_url(&self, cart_id: &CartId, store_id: &StoreId) -> Result<String, GatewayError> {
        let mut url = Url::parse(&self.config.return_url)
            .map_err(|e| GatewayError::InvalidReturnUrl(e.to_string()))?;
        url.query_pairs_mut()
            .append_pair("isOrder", "true")
            .append_pair("cartId", cart_id.as_str())
            .append_pair("storeId", store_id.as_str());
        Ok(url.into())
    }

    fn sign(&self, data: &str) -> Result<String, GatewayError> {
        let mut mac = HmacSha512::new_from_slice(self.config.secure_secret.as_bytes())
            .map_err(|_| GatewayError::NotConfigured("secure secret"))?;
        mac.update(data.as_bytes());
        Ok(hex::encode(mac.finalize().into_bytes()))
    }

    fn ensure_configured(&self) -> Result<(), GatewayError> {
        if self.config.tmn_code.is_empty() {
            return Err(GatewayError::NotConfigured("terminal code"));
        }
        if self.config.secure_secret.is_empty() {
            return Err(GatewayError::NotConfigured("secure secret"));
        }
        Ok(())
    }
}

/// The gateway takes amounts in hundredths of a dong.
fn minor_units(amount: Decimal) -> Decimal {
    (amount * Decimal::ONE_HUNDRED).round()
}

fn encode_sorted<'a>(pairs: impl Iterator<Item = (&'a str, &'a str)>) -> String {
    let mut serializer = url::form_urlencoded::Serializer::new(String::new());
    for (k, v) in pairs {
        serializer.append_pair(k, v);
    }
    serializer.finish()
}

fn constant_time_eq(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut res = 0u8;
    for (x, y) in a.as_bytes().iter().zip(b.as_bytes()) {
        res |= x ^ y;
    }
    res == 0
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rust_decimal_macros::dec;

    fn gateway() -> RedirectGateway {
        RedirectGateway::new(GatewayConfig {
            tmn_code: "TESTCODE".into(),
            secure_secret: "TESTSECRET".into(),
            ..GatewayConfig::default()
        })
    }

    fn request() -> GatewayPaymentRequest {
        GatewayPaymentRequest {
            txn_ref: "sess_abc".into(),
            amount: dec!(234000),
            cart_id: CartId::new("cart1"),
            store_id: StoreId::new("store1"),
            created_at: Utc.with_ymd_and_hms(2024, 3, 1, 1, 2, 3).unwrap(),
        }
    }

    fn query_of(url: &str) -> HashMap<String, String> {
        Url::parse(url).unwrap().query_pairs().into_owned().collect()
    }

    #[test]
    fn test_payment_url_fields() {
        let url = gateway().build_payment_url(&request()).unwrap();
        assert!(url.starts_with("https://sandbox.vnpayment.vn/paymentv2/vpcpay.html?"));
        let q = query_of(&url);
        assert_eq!(q["vnp_Amount"], "23400000");
        assert_eq!(q["vnp_TxnRef"], "sess_abc");
        assert_eq!(q["vnp_CreateDate"], "20240301080203");
        assert_eq!(q["vnp_Version"], "2.1.0");
        assert!(q["vnp_ReturnUrl"].contains("isOrder=true&cartId=cart1&storeId=store1"));
        assert_eq!(q["vnp_SecureHash"].len(), 128);
    }

    #[test]
    fn test_return_roundtrip_verifies() {
        let gw = gateway();
        let mut q = query_of(&gw.build_payment_url(&request()).unwrap());
        // the gateway echoes our params plus its own, re-signed
        q.remove("vnp_SecureHash");
        q.insert("vnp_ResponseCode".into(), "00".into());
        q.insert("vnp_TransactionStatus".into(), "00".into());
        let signed: BTreeMap<&str, &str> = q.iter().map(|(k, v)| (k.as_str(), v.as_str())).collect();
        let hash = gw.sign(&encode_sorted(signed.into_iter())).unwrap();
        q.insert("vnp_SecureHash".into(), hash.to_uppercase());

        let ret = gw.verify_return(&q).unwrap();
        assert_eq!(ret.txn_ref, "sess_abc");
        assert_eq!(ret.amount, dec!(234000));
        assert!(ret.is_success());
    }

    #[test]
    fn test_tampered_amount_rejected() {
        let gw = gateway();
        let mut q = query_of(&gw.build_payment_url(&request()).unwrap());
        q.insert("vnp_ResponseCode".into(), "00".into());
        q.insert("vnp_Amount".into(), "100".into());
        assert_eq!(gw.verify_return(&q), Err(GatewayError::InvalidSignature));
    }

    #[test]
    fn test_missing_signature() {
        let q = HashMap::from([("vnp_TxnRef".to_string(), "x".to_string())]);
        assert_eq!(
            gateway().verify_return(&q),
            Err(GatewayError::MissingField("vnp_SecureHash"))
        );
    }

    #[test]
    fn test_unconfigured_gateway() {
        let gw = RedirectGateway::new(GatewayConfig::default());
        assert!(matches!(
            gw.build_payment_url(&request()),
            Err(GatewayError::NotConfigured(_))
        ));
    }

    #[test]
    fn test_failed_payment_code() {
        let ret = GatewayReturn {
            txn_ref: "t".into(),
            amount: dec!(1),
            response_code: "24".into(),
            transaction_status: Some("02".into()),
            transaction_no: None,
            bank_code: None,
        };
        assert!(!ret.is_success());
    }
}
