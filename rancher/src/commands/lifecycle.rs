use anyhow::{Context, Result};
use rancher_core::{rancher_error_hint, rancher_println, rancher_progress, rancher_success};
use rancher_core::{rancher_warning, RancherError};
use rancher_provider::{LifecycleController, StatusReport, Summary, Transition};

pub async fn handle_status(controller: &LifecycleController) -> Result<()> {
    let existence = controller.existence();
    let report = controller.status().await;

    rancher_println!("Homestead: {}", existence);
    rancher_println!("Box:       {}", report);
    print_next_steps(&report);
    Ok(())
}

pub async fn handle_transition(
    controller: &LifecycleController,
    transition: Transition,
) -> Result<()> {
    rancher_progress!("Running vagrant {}...", transition);

    match controller.execute(transition).await {
        Ok(report) => {
            if transition_reached(transition, &report) {
                rancher_success!("Box is now {}", report.status);
            } else {
                rancher_warning!("vagrant {} finished, box is {}", transition, report.status);
            }
            Ok(())
        }
        Err(e @ RancherError::PreconditionFailed(_)) => {
            rancher_error_hint!("Check project_dir, config_dir and vagrant_path in the rancher settings");
            Err(e.into())
        }
        Err(e @ RancherError::Timeout(_)) => {
            rancher_error_hint!("Raise --timeout or command_timeout_secs if vagrant needs longer");
            Err(e.into())
        }
        Err(e) => Err(e).with_context(|| format!("vagrant {} failed", transition)),
    }
}

pub fn handle_ssh(controller: &LifecycleController) -> Result<()> {
    controller.ssh().context("Failed to open an SSH terminal")?;
    rancher_success!("Opened SSH terminal");
    Ok(())
}

fn transition_reached(transition: Transition, report: &StatusReport) -> bool {
    match transition {
        Transition::Up | Transition::Provision => report.summary() == Summary::Up,
        Transition::Halt | Transition::Suspend | Transition::Destroy => {
            report.summary() == Summary::Down
        }
    }
}

fn print_next_steps(report: &StatusReport) {
    let transitions = report.available_transitions();
    if transitions.is_empty() {
        rancher_error_hint!("Set project_dir, config_dir and vagrant_path in the rancher settings");
        return;
    }
    let names: Vec<&str> = transitions.iter().map(Transition::name).collect();
    rancher_println!("Available: {}", names.join(", "));
}

#[cfg(test)]
mod tests {
    use super::*;
    use rancher_provider::VmStatus;

    fn report(status: VmStatus) -> StatusReport {
        StatusReport {
            exists: true,
            status,
        }
    }

    #[test]
    fn test_transition_reached() {
        assert!(transition_reached(Transition::Up, &report(VmStatus::Running)));
        assert!(!transition_reached(Transition::Up, &report(VmStatus::PoweredOff)));
        assert!(transition_reached(Transition::Suspend, &report(VmStatus::Saved)));
        assert!(transition_reached(Transition::Destroy, &report(VmStatus::NotCreated)));
        assert!(!transition_reached(Transition::Halt, &StatusReport::missing()));
    }
}
