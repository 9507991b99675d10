//! Mock payment gateway for testing.
//!
//! Supports:
//! - Pre-registered payments for lookups
//! - Error injection for order creation and lookups
//! - Call counting and captured order requests

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::billing::GatewayPayment;
use crate::ports::{CreateOrderRequest, GatewayError, GatewayOrder, PaymentGateway};

/// Mock payment gateway.
///
/// ```ignore
/// let gateway = MockPaymentGateway::new();
/// gateway.add_payment(captured_payment);
/// gateway.fail_next_lookups(2, GatewayError::network("reset"));
/// ```
#[derive(Default, Clone)]
pub struct MockPaymentGateway {
    inner: Arc<Mutex<MockState>>,
}

#[derive(Default)]
struct MockState {
    payments: HashMap<String, GatewayPayment>,
    orders: Vec<CreateOrderRequest>,
    create_error: Option<GatewayError>,
    lookup_failures: u32,
    lookup_error: Option<GatewayError>,
    fetch_calls: u32,
    list_calls: u32,
}

impl MockPaymentGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a payment returned by lookups (replaces one with the same id).
    pub fn add_payment(&self, payment: GatewayPayment) {
        let mut state = self.inner.lock().unwrap();
        state.payments.insert(payment.id.clone(), payment);
    }

    /// Makes every subsequent `create_order` fail with `error`.
    pub fn fail_create_order(&self, error: GatewayError) {
        self.inner.lock().unwrap().create_error = Some(error);
    }

    /// Makes the next `count` lookups (fetch or list) fail with `error`.
    pub fn fail_next_lookups(&self, count: u32, error: GatewayError) {
        let mut state = self.inner.lock().unwrap();
        state.lookup_failures = count;
        state.lookup_error = Some(error);
    }

    pub fn fetch_calls(&self) -> u32 {
        self.inner.lock().unwrap().fetch_calls
    }

    pub fn list_calls(&self) -> u32 {
        self.inner.lock().unwrap().list_calls
    }

    /// Order requests received so far.
    pub fn created_orders(&self) -> Vec<CreateOrderRequest> {
        self.inner.lock().unwrap().orders.clone()
    }

    fn take_lookup_failure(state: &mut MockState) -> Option<GatewayError> {
        if state.lookup_failures == 0 {
            return None;
        }
        state.lookup_failures -= 1;
        state.lookup_error.clone()
    }
}

#[async_trait]
impl PaymentGateway for MockPaymentGateway {
    async fn create_order(&self, request: CreateOrderRequest) -> Result<GatewayOrder, GatewayError> {
        let mut state = self.inner.lock().unwrap();
        if let Some(err) = state.create_error.clone() {
            return Err(err);
        }

        let order = GatewayOrder {
            order_id: format!("order_{}", &Uuid::new_v4().simple().to_string()[..14]),
            amount_minor_units: request.amount_minor_units,
            currency: request.currency.clone(),
        };
        state.orders.push(request);
        Ok(order)
    }

    async fn fetch_payment(&self, payment_id: &str) -> Result<Option<GatewayPayment>, GatewayError> {
        let mut state = self.inner.lock().unwrap();
        state.fetch_calls += 1;
        if let Some(err) = Self::take_lookup_failure(&mut state) {
            return Err(err);
        }
        Ok(state.payments.get(payment_id).cloned())
    }

    async fn list_payments_for_order(&self, order_id: &str) -> Result<Vec<GatewayPayment>, GatewayError> {
        let mut state = self.inner.lock().unwrap();
        state.list_calls += 1;
        if let Some(err) = Self::take_lookup_failure(&mut state) {
            return Err(err);
        }
        let mut payments: Vec<GatewayPayment> = state
            .payments
            .values()
            .filter(|p| p.belongs_to_order(order_id))
            .cloned()
            .collect();
        payments.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(payments)
    }
}
