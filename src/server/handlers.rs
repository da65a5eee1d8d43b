use axum::Json;
use axum::body::Bytes;
use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use std::fmt;
use tracing::{debug, info};

use super::AppState;
use crate::core::conversion::{
    ConversionError, ConversionRequest, ConversionResult, convert, field_text,
};
use crate::core::currency::{RateTableProvider, lookup_rate};

/// What a finished `/convert` call did, attached to the response so the
/// request log can pick it up.
#[derive(Debug, Clone)]
pub struct ConversionRecord {
    request: ConversionRequest,
    outcome: Result<ConversionResult, String>,
}

impl fmt::Display for ConversionRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "fromCurrency: {}, toCurrency: {}, amount: {}",
            field_text(self.request.from_currency.as_deref()),
            field_text(self.request.to_currency.as_deref()),
            field_text(self.request.amount.as_deref())
        )?;
        match &self.outcome {
            Ok(result) => write!(
                f,
                ", rate: {}, convertedAmount: {}",
                result.rate, result.converted_amount
            ),
            Err(message) => write!(f, ", error: {message}"),
        }
    }
}

/// `POST /convert`
///
/// The body is parsed by hand so that malformed or non-object JSON falls
/// into the same "missing parameters" answer as an empty object.
pub async fn convert_currency(State(state): State<AppState>, body: Bytes) -> Response {
    let request = ConversionRequest::from_slice(&body).unwrap_or_else(|e| {
        debug!(error = %e, "Unreadable conversion body");
        ConversionRequest::default()
    });

    let result = process(state.provider.as_ref(), &request).await;
    let record = ConversionRecord {
        request,
        outcome: result.as_ref().copied().map_err(|e| e.to_string()),
    };

    let mut response = match result {
        Ok(result) => Json(result).into_response(),
        Err(err) => err.into_response(),
    };
    response.extensions_mut().insert(record);
    response
}

/// Validate, fetch, compute. Every request performs a fresh upstream lookup.
pub async fn process(
    provider: &dyn RateTableProvider,
    request: &ConversionRequest,
) -> Result<ConversionResult, ConversionError> {
    let validated = request.validate()?;
    let table = provider
        .fetch_rates(&validated.from_currency)
        .await
        .map_err(ConversionError::Upstream)?;
    let rate = lookup_rate(&table, &validated.to_currency)?;
    Ok(convert(validated.amount, rate))
}

pub async fn health() -> &'static str {
    "ok"
}

/// Writes one info line per completed conversion, after the response is built.
pub async fn log_request(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_string();

    let response = next.run(request).await;

    if let Some(record) = response.extensions().get::<ConversionRecord>() {
        info!(
            status = response.status().as_u16(),
            "{} {} - {}",
            method,
            path,
            record
        );
    }
    response
}
