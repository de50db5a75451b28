//! Every injected fault must be reported as the phase it broke

use betocq_core::constants::TRANSFER_FILE_SIZE_1KB;
use betocq_core::{run_scenario, FailureReason, ScenarioReport, ScenarioSpec};
use betocq_harness::{simulated_config, Fault, FaultPlan, MockPair};

fn create_test_spec(fault: Fault) -> ScenarioSpec {
    if fault.needs_upgrade() {
        ScenarioSpec::scc_5g_wfd_sta()
    } else {
        ScenarioSpec {
            file_size_kb: TRANSFER_FILE_SIZE_1KB,
            ..ScenarioSpec::bt_performance()
        }
    }
}

async fn run_with_fault(plan: FaultPlan, spec: &ScenarioSpec, iterations: u32) -> ScenarioReport {
    let config = simulated_config();
    let pair = MockPair::from_config(&config, spec, plan);
    let mut ctx = pair.context(config);
    ctx.iterations_override = Some(iterations);
    run_scenario(&ctx, spec).await.unwrap()
}

#[tokio::test(start_paused = true)]
async fn test_each_fault_maps_to_its_phase() {
    for fault in Fault::ALL.iter().copied() {
        let spec = create_test_spec(fault);
        let report = run_with_fault(FaultPlan::always(fault), &spec, 1).await;

        assert!(!report.passed, "{} should fail {}", fault, spec.id);
        assert!(!report.infrastructure_abort, "{} is not an infrastructure fault", fault);
        assert_eq!(
            report.final_reason,
            fault.expected_reason(),
            "{} reported {}",
            fault,
            report.final_reason
        );
        assert!(
            report.iterations[0].result.contains(fault.expected_reason().name()),
            "{}: {}",
            fault,
            report.iterations[0].result
        );
    }
}

#[tokio::test(start_paused = true)]
async fn test_consecutive_failures_stop_the_scenario() {
    let spec = ScenarioSpec {
        max_consecutive_errors: 2,
        ..create_test_spec(Fault::TransferFailure)
    };
    let report = run_with_fault(FaultPlan::always(Fault::TransferFailure), &spec, 10).await;

    assert_eq!(report.required_iterations, 10);
    assert_eq!(report.finished_iterations, 2);
    assert_eq!(report.final_reason, FailureReason::FileTransferFail);
    assert!(report.result.starts_with("FAIL: low success rate"));
}

#[tokio::test(start_paused = true)]
async fn test_fault_budget_only_hits_first_iterations() {
    let spec = ScenarioSpec {
        max_consecutive_errors: 5,
        success_rate_target: 0.5,
        ..create_test_spec(Fault::UnsuccessfulResult)
    };
    let report = run_with_fault(FaultPlan::times(Fault::UnsuccessfulResult, 2), &spec, 4).await;

    assert_eq!(report.finished_iterations, 4);
    assert_eq!(report.failed_iterations, 2);
    assert!(report.passed);
    assert_eq!(report.final_reason, FailureReason::Success);
}
