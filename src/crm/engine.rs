//! CRM engine
//!
//! Ties the repository, the coordinate codec and the series forecaster
//! together into the two request flows:
//!
//! - `ratios`: defaulting -> estimator -> normalizer -> ratio forecaster
//! - `production`: `ratios`, then the rate engine on the forecast ratios and
//!   the production forecaster on the producer's history
//!
//! Each call is a sequential chain of repository reads; nothing is written.

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::codec::CoordinateCodec;
use crate::config::defaults::{FALLBACK_TIME_CONSTANT, MISSING_RATE_DEFAULT};
use crate::config::CrmConfig;
use crate::forecasting::SeriesForecaster;
use crate::physics_engine::{
    distance, next_injection_rate, next_production_rate, rate_samples, time_constant, RateSample,
};
use crate::storage::{CrmRepository, StoreError};
use crate::types::{
    latest_skin_factor, select_horizon, AppliedDefault, Horizon, LinkId, MissingDataRequest, Parameter,
    Well, WellDatum, WellId, WellType, YearMonth,
};

use super::defaulting::{compute_field_averages, resolve_parameters, FieldAverages, Resolution};
use super::error::CrmError;
use super::estimator::{connectivity_ratio, ConnectivityInputs};
use super::normalizer::{cap_for, normalize};
use super::production::{forecast_production, historical_points, ProductionPoint};
use super::ratio_forecast::{forecast_ratios, ForecastInput};

// ============================================================================
// Reports
// ============================================================================

/// One point of a link's historical ratio series.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistoricalRatio {
    pub date: NaiveDate,
    pub ratio: f64,
}

/// Computed connectivity of one active link.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkRatio {
    pub link_id: LinkId,
    pub injector_id: WellId,
    pub injector_name: String,
    pub calculated_ratio: f64,
    pub forecasted_ratio: Option<f64>,
    pub historical_data: Vec<HistoricalRatio>,
    #[serde(skip)]
    pub last_ratio: Option<f64>,
    /// Substitutions made for this link (producer and injector side)
    #[serde(skip)]
    pub defaults: Vec<MissingDataRequest>,
}

impl LinkRatio {
    /// Forecast ratio when one was emitted, the calculated one otherwise.
    pub fn effective_ratio(&self) -> f64 {
        self.forecasted_ratio.unwrap_or(self.calculated_ratio)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RatiosReport {
    pub results: Vec<LinkRatio>,
    pub applied_defaults: Vec<AppliedDefault>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductionReport {
    pub producer_id: WellId,
    pub production_rate: f64,
    pub current_production: f64,
    pub injection_rates: BTreeMap<WellId, f64>,
    pub current_injection_rates: BTreeMap<WellId, f64>,
    pub time_constant: f64,
    pub connectivity_factors: BTreeMap<WellId, f64>,
    pub applied_defaults: Vec<AppliedDefault>,
    pub historical_production: Vec<ProductionPoint>,
    pub forecasted_production: Vec<ProductionPoint>,
}

// ============================================================================
// Engine
// ============================================================================

/// The producer side of a request, resolved once.
struct ProducerContext {
    well: Well,
    horizon: Horizon,
    resolution: Resolution,
    rate: f64,
    skin: f64,
}

pub struct CrmEngine {
    repo: Arc<dyn CrmRepository>,
    codec: Arc<dyn CoordinateCodec>,
    forecaster: Arc<dyn SeriesForecaster>,
    config: CrmConfig,
}

impl CrmEngine {
    pub fn new(
        repo: Arc<dyn CrmRepository>,
        codec: Arc<dyn CoordinateCodec>,
        forecaster: Arc<dyn SeriesForecaster>,
        config: CrmConfig,
    ) -> Self {
        Self {
            repo,
            codec,
            forecaster,
            config,
        }
    }

    pub fn backend_name(&self) -> &'static str {
        self.repo.backend_name()
    }

    pub fn config(&self) -> &CrmConfig {
        &self.config
    }

    /// Current field averages, falling back to the configured constants.
    pub fn field_averages(&self) -> FieldAverages {
        compute_field_averages(self.repo.as_ref(), &self.config.field_defaults)
    }

    fn load_producer(&self, producer_id: WellId, averages: &FieldAverages) -> Result<ProducerContext, CrmError> {
        let well = self
            .repo
            .well(producer_id)?
            .ok_or(CrmError::ProducerNotFound(producer_id))?;
        if well.well_type != WellType::Producer {
            return Err(CrmError::NotAProducer(producer_id));
        }

        let horizons = self.repo.horizons_for_well(producer_id)?;
        let horizon = select_horizon(&horizons)
            .cloned()
            .ok_or(CrmError::NoEligibleHorizon(producer_id))?;

        let resolution = resolve_parameters(&well, &horizon, averages, WellType::Producer, None);
        let rate = latest_rate(&self.repo.well_data(producer_id)?);
        let skin = self.latest_skin(producer_id)?;

        Ok(ProducerContext {
            well,
            horizon,
            resolution,
            rate,
            skin,
        })
    }

    fn latest_skin(&self, well_id: WellId) -> Result<f64, StoreError> {
        let samples = self.repo.skin_factors_for_well(well_id)?;
        Ok(latest_skin_factor(&samples).map_or(0.0, |s| s.value))
    }

    /// Connectivity ratios of every active link of a producer.
    pub fn ratios(&self, producer_id: WellId) -> Result<RatiosReport, CrmError> {
        let averages = self.field_averages();
        let producer = self.load_producer(producer_id, &averages)?;

        let mut results = Vec::new();
        for link in self.repo.active_links_for_producer(producer_id)? {
            let Some(injector) = self.repo.well(link.injector_id)? else {
                warn!(producer_id, link_id = link.id, injector_id = link.injector_id, "Injector not found, skipping link");
                continue;
            };
            let injector_horizons = self.repo.horizons_for_well(injector.id)?;
            let Some(injector_horizon) = select_horizon(&injector_horizons) else {
                warn!(producer_id, link_id = link.id, well_id = injector.id, "Injector has no eligible horizon, skipping link");
                continue;
            };

            let producer_side = resolve_parameters(
                &producer.well,
                &producer.horizon,
                &averages,
                WellType::Producer,
                Some(link.id),
            );
            let injector_side =
                resolve_parameters(&injector, injector_horizon, &averages, WellType::Injector, Some(link.id));

            let inputs = ConnectivityInputs {
                producer: producer_side.params,
                injector: injector_side.params,
                distance_m: distance(self.codec.as_ref(), &producer.well, &injector),
                producer_rate: producer.rate,
                injector_rate: latest_rate(&self.repo.well_data(injector.id)?),
                producer_skin: producer.skin,
            };
            let calculated = connectivity_ratio(&inputs, link.last_ratio, &self.config.smoothing);
            debug!(
                producer_id,
                link_id = link.id,
                injector_id = injector.id,
                distance_m = inputs.distance_m,
                ratio = calculated,
                "Link ratio computed"
            );

            let historical_data = self
                .repo
                .measurings_for_link(link.id)?
                .into_iter()
                .map(|m| HistoricalRatio {
                    date: m.date,
                    ratio: m.ratio,
                })
                .collect();

            let mut defaults = producer_side.requests;
            defaults.extend(injector_side.requests);

            results.push(LinkRatio {
                link_id: link.id,
                injector_id: injector.id,
                injector_name: injector.name,
                calculated_ratio: calculated,
                forecasted_ratio: None,
                historical_data,
                last_ratio: link.last_ratio,
                defaults,
            });
        }

        normalize_and_forecast(&mut results, &self.config);

        let applied_defaults = dedup_defaults(
            producer
                .resolution
                .requests
                .iter()
                .chain(results.iter().flat_map(|r| r.defaults.iter())),
        );

        info!(
            producer_id,
            links = results.len(),
            defaults = applied_defaults.len(),
            "Ratios computed"
        );
        Ok(RatiosReport {
            results,
            applied_defaults,
        })
    }

    /// Production forecast of a producer as of the current month.
    pub fn production(&self, producer_id: WellId) -> Result<ProductionReport, CrmError> {
        self.production_at(producer_id, YearMonth::from_date(Utc::now().date_naive()))
    }

    /// Production forecast of a producer as of `today`.
    pub fn production_at(&self, producer_id: WellId, today: YearMonth) -> Result<ProductionReport, CrmError> {
        let ratios = self.ratios(producer_id)?;

        // Links sharing an injector add up
        let mut connectivity_factors: BTreeMap<WellId, f64> = BTreeMap::new();
        for r in &ratios.results {
            *connectivity_factors.entry(r.injector_id).or_insert(0.0) += r.effective_ratio();
        }

        let production = rate_samples(&self.repo.well_data(producer_id)?);
        let mut injections: BTreeMap<WellId, Vec<RateSample>> = BTreeMap::new();
        for &injector_id in connectivity_factors.keys() {
            injections.insert(injector_id, rate_samples(&self.repo.well_data(injector_id)?));
        }

        let tau = self.producer_time_constant(producer_id);
        let production_rate = next_production_rate(&production, &injections, &connectivity_factors, tau);

        let mut injection_rates = BTreeMap::new();
        let mut current_injection_rates = BTreeMap::new();
        for (&injector_id, history) in &injections {
            let ratio = connectivity_factors.get(&injector_id).copied().unwrap_or(0.0);
            injection_rates.insert(injector_id, next_injection_rate(history, ratio, tau));
            current_injection_rates.insert(injector_id, history.last().map_or(0.0, |s| s.rate));
        }

        let forecasted_production =
            forecast_production(&production, self.forecaster.as_ref(), &self.config.forecast, today);

        info!(
            producer_id,
            production_rate,
            time_constant = tau,
            forecast_points = forecasted_production.len(),
            "Production computed"
        );

        Ok(ProductionReport {
            producer_id,
            production_rate,
            current_production: production.last().map_or(0.0, |s| s.rate),
            injection_rates,
            current_injection_rates,
            time_constant: tau,
            connectivity_factors,
            applied_defaults: ratios.applied_defaults,
            historical_production: historical_points(&production),
            forecasted_production,
        })
    }

    /// Producer time constant τ, or 1.0 when it cannot be computed.
    pub fn producer_time_constant(&self, producer_id: WellId) -> f64 {
        let averages = self.field_averages();
        let producer = match self.load_producer(producer_id, &averages) {
            Ok(p) => p,
            Err(e) => {
                warn!(producer_id, error = %e, "Time constant unavailable, using fallback");
                return FALLBACK_TIME_CONSTANT;
            }
        };

        let tau = time_constant(&producer.resolution.params, producer.skin);
        if tau.is_finite() && tau > 0.0 {
            tau
        } else {
            warn!(producer_id, tau, "Time constant not positive, using fallback");
            FALLBACK_TIME_CONSTANT
        }
    }
}

/// Latest monthly rate; a missing sample or a sample without a rate reads
/// as 1.
fn latest_rate(data: &[WellDatum]) -> f64 {
    data.iter()
        .max_by_key(|d| (d.period(), d.id))
        .and_then(|d| d.rate)
        .unwrap_or(MISSING_RATE_DEFAULT)
}

/// Normalize calculated ratios, then forecast and normalize the forecasts
/// under the same caps.
fn normalize_and_forecast(results: &mut [LinkRatio], config: &CrmConfig) {
    if results.is_empty() {
        return;
    }
    let caps: Vec<f64> = results.iter().map(|r| cap_for(r.last_ratio)).collect();

    let mut calculated: Vec<f64> = results.iter().map(|r| r.calculated_ratio).collect();
    if normalize(&mut calculated, &caps) {
        debug!("Calculated ratios clipped at 1 - last ratio");
    }
    for (r, v) in results.iter_mut().zip(&calculated) {
        r.calculated_ratio = *v;
    }

    let histories: Vec<Vec<f64>> = results
        .iter()
        .map(|r| r.historical_data.iter().map(|h| h.ratio).collect())
        .collect();
    let inputs: Vec<ForecastInput<'_>> = results
        .iter()
        .zip(&histories)
        .zip(&caps)
        .map(|((r, history), &cap)| ForecastInput {
            history,
            calculated: r.calculated_ratio,
            cap,
        })
        .collect();

    match forecast_ratios(&inputs, &config.forecast) {
        Some(mut forecasts) => {
            normalize(&mut forecasts, &caps);
            for (r, v) in results.iter_mut().zip(forecasts) {
                r.forecasted_ratio = Some(v);
            }
        }
        None => debug!("Weighted ratio forecasts sum to zero, no forecast emitted"),
    }
}

/// One audit entry per (well, parameter), first occurrence wins.
fn dedup_defaults<'a>(requests: impl Iterator<Item = &'a MissingDataRequest>) -> Vec<AppliedDefault> {
    let mut seen: HashSet<(WellId, Parameter)> = HashSet::new();
    requests
        .filter(|r| seen.insert((r.well_id, r.parameter)))
        .map(AppliedDefault::from)
        .collect()
}
