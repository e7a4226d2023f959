use crate::infra::{Datasets, Services};
use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use clap::Args;
use lifeline::config::AppConfig;
use lifeline::error::AppError;
use lifeline::workflows::emergency::{EmergencyContact, SosRequest, UserLocation};
use lifeline::workflows::matching::{
    rank_blood_donors, rank_organ_matches, BloodRequest, DonorMatchView, LogisticLikelihoodModel,
    OrganMatchView, OrganRequest,
};
use lifeline::workflows::monitor::InventoryLevel;
use lifeline::workflows::outreach::{
    DryRunMessenger, ManualClock, OutreachAttempt, OutreachOutcome, OutreachRequest, SystemClock,
};
use lifeline::workflows::registry::{
    BloodGroup, ConfirmationOutcome, Coordinates, CsvDonorRepository, CsvOrganOfferRepository,
    DonationConfirmation, DonationRecorder, DonorId, DonorRepository, InMemoryDonorRepository,
    OrganOfferRepository, OrganType,
};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Args, Debug)]
pub(crate) struct RankBloodArgs {
    /// Requested blood group (O+, O-, A+, A-, B+, B-, AB+, AB-)
    #[arg(long, value_parser = crate::infra::parse_blood_group)]
    pub(crate) blood_group: BloodGroup,
    #[arg(long, allow_negative_numbers = true)]
    pub(crate) lat: f64,
    #[arg(long, allow_negative_numbers = true)]
    pub(crate) lon: f64,
    /// Request date used for the donation cooldown (YYYY-MM-DD). Defaults to today.
    #[arg(long, value_parser = crate::infra::parse_date)]
    pub(crate) date: Option<NaiveDate>,
    #[arg(long, default_value_t = 5)]
    pub(crate) top_n: usize,
    /// Donor dataset to rank instead of the configured one
    #[arg(long)]
    pub(crate) donors: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub(crate) struct RankOrganArgs {
    /// Organ type, e.g. Kidney, Liver, Heart
    #[arg(long)]
    pub(crate) organ: String,
    #[arg(long, allow_negative_numbers = true)]
    pub(crate) lat: f64,
    #[arg(long, allow_negative_numbers = true)]
    pub(crate) lon: f64,
    #[arg(long, default_value_t = 5)]
    pub(crate) top_n: usize,
    /// Organ offer dataset to rank instead of the configured one
    #[arg(long)]
    pub(crate) organs: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub(crate) struct ConfirmArgs {
    #[arg(long)]
    pub(crate) donor_id: String,
    /// Units donated
    #[arg(long, default_value_t = 1)]
    pub(crate) volume: u32,
    /// Key identifying this donation; repeating it is a no-op
    #[arg(long)]
    pub(crate) confirmation_id: Option<String>,
    /// Donor dataset to update instead of the configured one
    #[arg(long)]
    pub(crate) donors: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub(crate) struct DemoArgs {
    /// Demo date; the default matches the bundled sample datasets.
    #[arg(long, value_parser = crate::infra::parse_date, default_value = "2024-06-01")]
    pub(crate) today: NaiveDate,
    /// Blood group used for the ranking and outreach walkthrough.
    #[arg(long, value_parser = crate::infra::parse_blood_group)]
    pub(crate) blood_group: Option<BloodGroup>,
    /// Organ used for the organ matching walkthrough.
    #[arg(long)]
    pub(crate) organ: Option<String>,
}

pub(crate) fn run_rank_blood(args: RankBloodArgs) -> Result<(), AppError> {
    let config = AppConfig::load()?;
    let donors_path = args.donors.unwrap_or(config.datasets.donors);
    let donors = CsvDonorRepository::open(&donors_path)?;
    let model = LogisticLikelihoodModel::from_path(&config.datasets.likelihood_model)?;

    let request = BloodRequest {
        blood_group: args.blood_group,
        location: Coordinates::new(args.lat, args.lon),
        request_date: args.date.unwrap_or_else(|| Utc::now().date_naive()),
        top_n: args.top_n,
    };
    let ranked = rank_blood_donors(&donors.all()?, &request, &model);

    println!(
        "Blood donors for {} near ({:.4}, {:.4}) on {}",
        request.blood_group, args.lat, args.lon, request.request_date
    );
    let views = ranked.iter().map(DonorMatchView::from).collect::<Vec<_>>();
    render_donor_table(&views);
    Ok(())
}

pub(crate) fn run_rank_organ(args: RankOrganArgs) -> Result<(), AppError> {
    let config = AppConfig::load()?;
    let organs_path = args.organs.unwrap_or(config.datasets.organs);
    let organs = CsvOrganOfferRepository::open(&organs_path)?;

    let request = OrganRequest {
        organ: OrganType::from(args.organ.as_str()),
        location: Coordinates::new(args.lat, args.lon),
        now: Utc::now(),
        top_n: args.top_n,
    };
    let ranked = rank_organ_matches(&organs.all()?, &request);

    println!("{} offers near ({:.4}, {:.4})", request.organ, args.lat, args.lon);
    let views = ranked.iter().map(OrganMatchView::from).collect::<Vec<_>>();
    render_organ_table(&views);
    Ok(())
}

pub(crate) fn run_confirm(args: ConfirmArgs) -> Result<(), AppError> {
    let config = AppConfig::load()?;
    let donors_path = args.donors.unwrap_or(config.datasets.donors);
    let repository = Arc::new(CsvDonorRepository::open(&donors_path)?);
    let recorder = DonationRecorder::new(repository, Arc::new(SystemClock));

    let outcome = recorder.confirm(DonationConfirmation {
        donor_id: DonorId(args.donor_id),
        volume: args.volume,
        confirmation_id: args.confirmation_id,
    })?;

    match outcome {
        ConfirmationOutcome::Recorded(donor) => println!(
            "Recorded donation for {} ({}): {} donations, {} units, last on {}",
            donor.donor_id,
            donor.name,
            donor.donation_count,
            donor.volume_donated,
            format_date(donor.last_donation)
        ),
        ConfirmationOutcome::AlreadyApplied(donor) => println!(
            "Confirmation already applied for {}; record unchanged",
            donor.donor_id
        ),
        ConfirmationOutcome::NotFound(donor_id) => {
            println!("Donor {donor_id} not found; dataset unchanged")
        }
    }
    Ok(())
}

/// End-to-end walkthrough over the configured datasets. Donor updates stay in memory
/// and messages go through the dry-run messenger.
pub(crate) async fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let config = AppConfig::load()?;
    let mut datasets = Datasets::load(&config.datasets)?;
    datasets.donors = Arc::new(InMemoryDonorRepository::new(datasets.donors.all()?));

    let now = demo_instant(args.today);
    let blood_group = args.blood_group.unwrap_or(BloodGroup::OPositive);
    let organ = OrganType::from(args.organ.as_deref().unwrap_or("Kidney"));
    let site = config.outreach.site;
    let services = Services::build(
        &config.outreach,
        datasets,
        Arc::new(DryRunMessenger::default()),
        Arc::new(ManualClock::new(now)),
    );

    println!("Lifeline demo ({})", now.date_naive());

    let blood_request = BloodRequest {
        blood_group,
        location: site,
        request_date: now.date_naive(),
        top_n: config.outreach.top_n,
    };
    println!("\n1. Ranking {blood_group} donors near the site");
    let ranked = services.engine.blood_donors(&blood_request)?;
    render_donor_table(&ranked.iter().map(DonorMatchView::from).collect::<Vec<_>>());

    println!("\n2. Failover outreach (dry run)");
    let mut request = OutreachRequest::new(blood_group, site);
    request.urgency_level = 8;
    let contacted = match services.outreach.initiate(request).await {
        Ok(outcome) => {
            render_outreach(&outcome);
            match outcome {
                OutreachOutcome::Contacted { donor_id, .. } => Some(donor_id),
                _ => None,
            }
        }
        Err(err) => {
            println!("  Outreach rejected: {err}");
            None
        }
    };

    if let Some(donor_id) = contacted {
        println!("\n3. Confirming the donation");
        let confirmation = DonationConfirmation {
            donor_id: donor_id.clone(),
            volume: 1,
            confirmation_id: Some(format!("demo-{donor_id}")),
        };
        match services.recorder.confirm(confirmation) {
            Ok(ConfirmationOutcome::Recorded(donor)) => println!(
                "  {} now has {} donations, last on {}",
                donor.donor_id,
                donor.donation_count,
                format_date(donor.last_donation)
            ),
            Ok(other) => println!("  Unexpected confirmation outcome: {other:?}"),
            Err(err) => println!("  Confirmation failed: {err}"),
        }
        let reranked = services.engine.blood_donors(&blood_request)?;
        let still_listed = reranked
            .iter()
            .any(|candidate| candidate.donor.donor_id == donor_id);
        println!(
            "  Re-ranking {} the donor while the donation cooldown runs",
            if still_listed { "still lists" } else { "excludes" }
        );
    }

    println!("\n4. Ranking {organ} offers near the site");
    let organ_request = OrganRequest {
        organ: organ.clone(),
        location: site,
        now,
        top_n: config.outreach.top_n,
    };
    let organ_matches = services.engine.organ_matches(&organ_request)?;
    render_organ_table(&organ_matches.iter().map(OrganMatchView::from).collect::<Vec<_>>());

    println!("\n5. SOS for {organ} with two emergency contacts");
    let sos = SosRequest {
        user_id: Some("demo-user".to_string()),
        user_name: Some("Demo Patient".to_string()),
        emergency_type: Some("organ".to_string()),
        blood_group: None,
        organ_type: Some(organ.label().to_string()),
        user_location: Some(UserLocation {
            latitude: site.latitude,
            longitude: site.longitude,
            address: Some("Site entrance".to_string()),
        }),
        emergency_contacts: vec![
            EmergencyContact {
                name: Some("Relative".to_string()),
                phone_number: "+919800000001".to_string(),
            },
            EmergencyContact {
                name: None,
                phone_number: "+919800000002".to_string(),
            },
        ],
    };
    match services.sos.trigger(sos).await {
        Ok(report) => {
            println!("  SOS id: {}", report.sos_id);
            println!(
                "  Contacts alerted: {}/{}",
                report.contact_alerts.successful_alerts, report.contact_alerts.total_contacts
            );
            match &report.hospital_alert {
                Some(alert) => println!(
                    "  Hospital alerted: {} ({:.1} km, {})",
                    alert.hospital_name,
                    alert.distance_km,
                    describe_attempt(&alert.attempt)
                ),
                None => println!("  Hospital alert: no hospital available"),
            }
            println!(
                "  Autonomous search found {} candidates",
                report.autonomous_search.found()
            );
            println!("  Overall: {}", if report.success { "success" } else { "failed" });
        }
        Err(err) => println!("  SOS rejected: {err}"),
    }

    println!("\n6. Inventory shortage cycle");
    let levels = [
        InventoryLevel {
            blood_group: BloodGroup::ONegative,
            units: 3,
        },
        InventoryLevel {
            blood_group: BloodGroup::APositive,
            units: 30,
        },
        InventoryLevel {
            blood_group,
            units: 5,
        },
    ];
    let cycle = services.monitor.run_cycle(&levels).await;
    for shortage in &cycle.shortages {
        println!(
            "  {}: {} of {} units (severity {:.2}, urgency {})",
            shortage.blood_group,
            shortage.units,
            shortage.threshold,
            shortage.severity,
            shortage.urgency_level
        );
    }
    for entry in &cycle.outreach {
        print!("  {} -> ", entry.blood_group);
        render_outreach(&entry.outcome);
    }
    if !cycle.skipped.is_empty() {
        let skipped = cycle
            .skipped
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>();
        println!("  Cooling down: {}", skipped.join(", "));
    }
    for failure in &cycle.failed {
        println!("  Failed: {failure}");
    }
    println!(
        "  {} attempts, {} donors contacted",
        cycle.total_attempts, cycle.successful_contacts
    );

    Ok(())
}

fn demo_instant(today: NaiveDate) -> DateTime<Utc> {
    today
        .and_hms_opt(12, 0, 0)
        .map(|naive| Utc.from_utc_datetime(&naive))
        .unwrap_or_else(Utc::now)
}

fn format_date(date: Option<NaiveDate>) -> String {
    date.map_or_else(|| "never".to_string(), |date| date.to_string())
}

fn describe_attempt(attempt: &OutreachAttempt) -> String {
    match &attempt.detail {
        Some(detail) => format!("{:?}: {detail}", attempt.outcome),
        None => format!("{:?}", attempt.outcome),
    }
}

fn render_donor_table(views: &[DonorMatchView]) {
    if views.is_empty() {
        println!("  No eligible donors found");
        return;
    }
    for (index, view) in views.iter().enumerate() {
        println!(
            "  {}. {} {} [{}] {:.2} km | likelihood {:.2} | score {:.4}",
            index + 1,
            view.donor_id,
            view.name,
            view.blood_group,
            view.distance_km,
            view.likelihood,
            view.suitability_score
        );
    }
}

fn render_organ_table(views: &[OrganMatchView]) {
    if views.is_empty() {
        println!("  No viable offers found");
        return;
    }
    for (index, view) in views.iter().enumerate() {
        println!(
            "  {}. {} {} | {:.1} h elapsed | {:.2} km | HLA {:.2} | score {:.4}",
            index + 1,
            view.offer_id,
            view.name,
            view.hours_elapsed,
            view.distance_km,
            view.hla_match_score,
            view.suitability_score
        );
    }
}

fn render_outreach(outcome: &OutreachOutcome) {
    match outcome {
        OutreachOutcome::Contacted {
            donor_id,
            donor_name,
            rank,
            attempts,
        } => println!(
            "  Contacted {donor_id} ({donor_name}) at rank {rank} after {} attempt(s)",
            attempts.len()
        ),
        OutreachOutcome::Exhausted { attempts } => {
            println!("  No donor accepted after {} attempt(s)", attempts.len())
        }
        OutreachOutcome::NoEligibleDonors { message } => println!("  {message}"),
        OutreachOutcome::Throttled { retry_after_secs } => {
            println!("  Throttled; retry in {retry_after_secs}s")
        }
    }
}
