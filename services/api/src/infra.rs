use chrono::NaiveDate;
use lifeline::config::{AppConfig, DatasetConfig, OutreachConfig};
use lifeline::error::AppError;
use lifeline::workflows::emergency::SosService;
use lifeline::workflows::matching::{LikelihoodModel, LogisticLikelihoodModel, MatchingEngine};
use lifeline::workflows::monitor::{ShortageMonitor, ShortageThresholds};
use lifeline::workflows::outreach::{
    Clock, DryRunMessenger, Messenger, OutreachService, OutreachSettings, SystemClock,
    TwilioMessenger,
};
use lifeline::workflows::registry::{
    BloodGroup, CsvDonorRepository, CsvHospitalDirectory, CsvOrganOfferRepository,
    DonationRecorder, DonorRepository, HospitalDirectory, OrganOfferRepository,
};
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Dataset stores and model loaded from disk. Any failure here is fatal at startup.
pub(crate) struct Datasets {
    pub(crate) donors: Arc<dyn DonorRepository>,
    pub(crate) organs: Arc<dyn OrganOfferRepository>,
    pub(crate) hospitals: Arc<dyn HospitalDirectory>,
    pub(crate) model: Arc<dyn LikelihoodModel>,
}

impl Datasets {
    pub(crate) fn load(config: &DatasetConfig) -> Result<Self, AppError> {
        let donors = CsvDonorRepository::open(&config.donors)?;
        let organs = CsvOrganOfferRepository::open(&config.organs)?;
        let hospitals = CsvHospitalDirectory::open(&config.hospitals)?;
        let model = LogisticLikelihoodModel::from_path(&config.likelihood_model)?;
        info!(
            model = %config.likelihood_model.display(),
            features = model.schema().len(),
            "likelihood model loaded"
        );

        Ok(Self {
            donors: Arc::new(donors),
            organs: Arc::new(organs),
            hospitals: Arc::new(hospitals),
            model: Arc::new(model),
        })
    }
}

/// Every workflow service the HTTP surface exposes.
#[derive(Clone)]
pub(crate) struct Services {
    pub(crate) engine: Arc<MatchingEngine>,
    pub(crate) clock: Arc<dyn Clock>,
    pub(crate) outreach: Arc<OutreachService>,
    pub(crate) recorder: Arc<DonationRecorder>,
    pub(crate) sos: Arc<SosService>,
    pub(crate) monitor: Arc<ShortageMonitor>,
}

impl Services {
    pub(crate) fn build(
        config: &OutreachConfig,
        datasets: Datasets,
        messenger: Arc<dyn Messenger>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let engine = Arc::new(MatchingEngine::new(
            Arc::clone(&datasets.donors),
            datasets.organs,
            datasets.model,
        ));
        let outreach = Arc::new(OutreachService::new(
            Arc::clone(&engine),
            Arc::clone(&messenger),
            Arc::clone(&clock),
            OutreachSettings {
                top_n: config.top_n,
                attempt_timeout: config.attempt_timeout,
                cooldown: chrono::Duration::minutes(config.cooldown_minutes),
            },
        ));
        let recorder = Arc::new(DonationRecorder::new(datasets.donors, Arc::clone(&clock)));
        let sos = Arc::new(SosService::new(
            Arc::clone(&engine),
            datasets.hospitals,
            messenger,
            Arc::clone(&clock),
            config.broadcast_concurrency,
            config.attempt_timeout,
        ));
        let monitor = Arc::new(ShortageMonitor::new(
            Arc::clone(&outreach),
            Arc::clone(&clock),
            ShortageThresholds::default(),
            config.site,
        ));

        Self {
            engine,
            clock,
            outreach,
            recorder,
            sos,
            monitor,
        }
    }

    pub(crate) fn from_config(config: &AppConfig) -> Result<Self, AppError> {
        let datasets = Datasets::load(&config.datasets)?;
        Ok(Self::build(
            &config.outreach,
            datasets,
            select_messenger(config),
            Arc::new(SystemClock),
        ))
    }
}

pub(crate) fn select_messenger(config: &AppConfig) -> Arc<dyn Messenger> {
    match &config.messaging {
        Some(messaging) => {
            let messenger = TwilioMessenger::new(messaging);
            info!(endpoint = messenger.endpoint(), "sms delivery enabled");
            Arc::new(messenger)
        }
        None => {
            warn!("sms credentials not configured, outreach messages will only be logged");
            Arc::new(DryRunMessenger::default())
        }
    }
}

pub(crate) fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|err| format!("failed to parse '{raw}' as YYYY-MM-DD ({err})"))
}

pub(crate) fn parse_blood_group(raw: &str) -> Result<BloodGroup, String> {
    raw.parse::<BloodGroup>().map_err(|err| err.to_string())
}
