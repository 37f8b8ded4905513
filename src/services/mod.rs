//! Business logic services

pub mod catalog;
pub mod clock;
pub mod fines;
pub mod reservations;
pub mod sweeper;

use std::sync::Arc;

use crate::{config::ReservationsConfig, repository::Repository};

/// Container for all services
#[derive(Clone)]
pub struct Services {
    pub catalog: catalog::CatalogService,
    pub reservations: reservations::ReservationsService,
    pub sweeper: Arc<sweeper::OverdueSweeper>,
}

impl Services {
    /// Create all services with the given repository and clock
    pub fn new(
        repository: Repository,
        reservations_config: &ReservationsConfig,
        clock: Arc<dyn clock::Clock>,
    ) -> Self {
        Self {
            catalog: catalog::CatalogService::new(repository.clone()),
            reservations: reservations::ReservationsService::new(
                repository.clone(),
                clock.clone(),
                reservations::ReservationPolicy::from(reservations_config),
            ),
            sweeper: Arc::new(sweeper::OverdueSweeper::new(
                repository,
                clock,
                reservations_config,
            )),
        }
    }
}
