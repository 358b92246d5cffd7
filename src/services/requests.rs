//! Request lifecycle service: pickup, return, cancel and request listings

use std::{collections::HashMap, sync::Arc};

use crate::{
    clock::Clock,
    error::{AppError, AppResult},
    models::{
        hardware_type::HardwareType,
        policy::LendingPolicy,
        request::{
            BatchOutcome, HardwareRequest, RequestDetails, RequestFilter, RequestScope,
            Transition, UserSummary,
        },
    },
    repository::LendingStore,
};

#[derive(Clone)]
pub struct RequestService {
    store: Arc<dyn LendingStore>,
    clock: Arc<dyn Clock>,
    policy: LendingPolicy,
}

impl RequestService {
    pub fn new(store: Arc<dyn LendingStore>, clock: Arc<dyn Clock>, policy: LendingPolicy) -> Self {
        Self {
            store,
            clock,
            policy,
        }
    }

    async fn transition(&self, request_id: i32, transition: Transition) -> AppResult<HardwareRequest> {
        let now = self.clock.now();
        match self
            .store
            .apply_transition(request_id, transition, &self.policy, now)
            .await
        {
            Ok(outcome) => {
                tracing::info!("Request {}: {:?} accepted", request_id, transition);
                Ok(outcome.into_request())
            }
            Err(AppError::Lending(e)) => {
                tracing::warn!("Request {}: {:?} rejected: {}", request_id, transition, e);
                Err(e.into())
            }
            Err(e) => Err(e),
        }
    }

    /// Hand a requested item out
    pub async fn pick_up(&self, request_id: i32, organizer_id: i32) -> AppResult<HardwareRequest> {
        self.transition(request_id, Transition::PickUp { organizer_id })
            .await
    }

    /// Receive an item back
    pub async fn return_request(
        &self,
        request_id: i32,
        organizer_id: i32,
    ) -> AppResult<HardwareRequest> {
        self.transition(request_id, Transition::Return { organizer_id })
            .await
    }

    /// Withdraw a pending request. Requests of other users are reported as missing.
    pub async fn cancel(&self, request_id: i32, requestor_id: i32) -> AppResult<()> {
        let request = self.store.get_request(request_id).await?;
        if request.requestor_id != requestor_id {
            return Err(AppError::NotFound(format!("Request {} not found", request_id)));
        }
        self.transition(request_id, Transition::Cancel).await?;
        Ok(())
    }

    pub async fn pick_up_many(&self, request_ids: &[i32], organizer_id: i32) -> AppResult<BatchOutcome> {
        self.batch(request_ids, Transition::PickUp { organizer_id })
            .await
    }

    pub async fn return_many(&self, request_ids: &[i32], organizer_id: i32) -> AppResult<BatchOutcome> {
        self.batch(request_ids, Transition::Return { organizer_id })
            .await
    }

    /// Apply a transition to each request on its own. A failing item does not
    /// undo the others; failures are keyed by hardware type name.
    async fn batch(&self, request_ids: &[i32], transition: Transition) -> AppResult<BatchOutcome> {
        let requests = self.store.get_requests(request_ids).await?;
        let names = self.type_index().await?;
        let mut outcome = BatchOutcome::default();

        for request in requests {
            let type_name = names
                .get(&request.type_id)
                .map(|hw| hw.name.clone())
                .unwrap_or_else(|| format!("#{}", request.type_id));

            match self.transition(request.id, transition).await {
                Ok(updated) => outcome.processed.push(updated),
                Err(AppError::Lending(e)) => {
                    outcome.failures.insert(type_name, e.to_string());
                }
                Err(AppError::NotFound(msg)) => {
                    outcome.failures.insert(type_name, msg);
                }
                Err(e) => return Err(e),
            }
        }

        Ok(outcome)
    }

    async fn type_index(&self) -> AppResult<HashMap<i32, HardwareType>> {
        let types = self.store.list_types().await?;
        Ok(types.into_iter().map(|hw| (hw.id, hw)).collect())
    }

    async fn details(&self, filter: RequestFilter) -> AppResult<Vec<RequestDetails>> {
        let now = self.clock.now();
        let requests = self.store.list_requests(&filter, &self.policy, now).await?;
        let types = self.type_index().await?;

        Ok(requests
            .into_iter()
            .filter_map(|request| {
                let hardware = types.get(&request.type_id)?;
                Some(RequestDetails::new(request, hardware, &self.policy, now))
            })
            .collect())
    }

    /// Requests of a user waiting to be picked up
    pub async fn pending_for(&self, user_id: i32) -> AppResult<Vec<RequestDetails>> {
        self.details(RequestFilter::for_user(user_id, RequestScope::Pending))
            .await
    }

    /// Pending requests plus everything the user ever picked up
    pub async fn historic_for(&self, user_id: i32) -> AppResult<Vec<RequestDetails>> {
        self.details(RequestFilter::for_user(user_id, RequestScope::Historic))
            .await
    }

    /// Items currently held by a user
    pub async fn active_for(&self, user_id: i32) -> AppResult<Vec<RequestDetails>> {
        self.details(RequestFilter::for_user(user_id, RequestScope::Active))
            .await
    }

    /// Items currently out, all users
    pub async fn active_overall(&self) -> AppResult<Vec<RequestDetails>> {
        self.details(RequestFilter::overall(RequestScope::Active))
            .await
    }

    pub async fn summary_for(&self, user_id: i32) -> AppResult<UserSummary> {
        let now = self.clock.now();
        let pending = self
            .store
            .count_requests(
                &RequestFilter::for_user(user_id, RequestScope::Pending),
                &self.policy,
                now,
            )
            .await?;
        let active = self
            .store
            .count_requests(
                &RequestFilter::for_user(user_id, RequestScope::Active),
                &self.policy,
                now,
            )
            .await?;
        Ok(UserSummary { pending, active })
    }
}
