//! Configurable gateway double for service tests: programmable charge
//! handles, per-payment statuses, and error injection.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::error::{AppError, AppResult};
use crate::gateways::adapter::{ChargeHandle, ChargeRequest, GatewayAdapter, GatewayStatus};
use crate::models::Gateway;

#[derive(Default)]
struct MockState {
    next_id: u64,
    statuses: HashMap<String, GatewayStatus>,
    fail_create: bool,
    fail_fetch: bool,
    create_calls: Vec<ChargeRequest>,
    fetch_calls: Vec<String>,
}

#[derive(Clone)]
pub struct MockGateway {
    gateway: Gateway,
    inner: Arc<Mutex<MockState>>,
}

impl MockGateway {
    pub fn new(gateway: Gateway) -> Self {
        Self {
            gateway,
            inner: Arc::new(Mutex::new(MockState::default())),
        }
    }

    pub fn set_status(&self, payment_id: &str, status: GatewayStatus) {
        self.inner
            .lock()
            .unwrap()
            .statuses
            .insert(payment_id.to_string(), status);
    }

    pub fn fail_create(&self, fail: bool) {
        self.inner.lock().unwrap().fail_create = fail;
    }

    pub fn fail_fetch(&self, fail: bool) {
        self.inner.lock().unwrap().fail_fetch = fail;
    }

    pub fn create_call_count(&self) -> usize {
        self.inner.lock().unwrap().create_calls.len()
    }

    pub fn fetch_call_count(&self) -> usize {
        self.inner.lock().unwrap().fetch_calls.len()
    }

    pub fn last_create_request(&self) -> Option<ChargeRequest> {
        self.inner.lock().unwrap().create_calls.last().cloned()
    }
}

#[async_trait]
impl GatewayAdapter for MockGateway {
    fn gateway(&self) -> Gateway {
        self.gateway
    }

    async fn create_charge(&self, request: &ChargeRequest) -> AppResult<ChargeHandle> {
        let mut state = self.inner.lock().unwrap();
        state.create_calls.push(request.clone());
        if state.fail_create {
            return Err(AppError::ExternalApiError("mock create failure".to_string()));
        }
        state.next_id += 1;
        let payment_id = format!("{}_{}", self.gateway, state.next_id);
        state
            .statuses
            .insert(payment_id.clone(), GatewayStatus::Pending);
        Ok(ChargeHandle {
            payment_id: payment_id.clone(),
            status: GatewayStatus::Pending,
            qr_code: Some("mock-qr-payload".to_string()),
            qr_code_url: Some(format!("https://gateway.test/qr/{payment_id}")),
            checkout_url: Some(format!("https://gateway.test/checkout/{payment_id}")),
        })
    }

    async fn fetch_status(&self, payment_id: &str) -> AppResult<GatewayStatus> {
        let mut state = self.inner.lock().unwrap();
        state.fetch_calls.push(payment_id.to_string());
        if state.fail_fetch {
            return Err(AppError::ExternalApiError("mock fetch failure".to_string()));
        }
        state
            .statuses
            .get(payment_id)
            .copied()
            .ok_or_else(|| AppError::ExternalApiError(format!("unknown payment {payment_id}")))
    }
}
