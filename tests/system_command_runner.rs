#![cfg(unix)]

use scene_batch::{BatchError, CommandOutcome, CommandRunner, SystemCommandRunner, ToolInvocation};

#[test]
fn reports_success_for_zero_exit() -> Result<(), BatchError> {
    let invocation = ToolInvocation::new("sh").arg("-c").arg("exit 0");

    let outcome = SystemCommandRunner::new().run(&invocation)?;

    assert_eq!(outcome, CommandOutcome::Success);
    Ok(())
}

#[test]
fn reports_exit_code_for_failure() -> Result<(), BatchError> {
    let invocation = ToolInvocation::new("sh").arg("-c").arg("exit 3");

    let outcome = SystemCommandRunner::new().run(&invocation)?;

    assert_eq!(outcome, CommandOutcome::Failed { code: Some(3) });
    Ok(())
}

#[test]
fn missing_program_is_a_spawn_error() {
    let invocation = ToolInvocation::new("/nonexistent/scene-batch-tool");

    let result = SystemCommandRunner::new().run(&invocation);

    assert!(matches!(result, Err(BatchError::Spawn { .. })));
}
