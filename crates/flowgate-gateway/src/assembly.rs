//! Policy assembly execution.
//!
//! The engine runs an assembly as an explicit state machine over a stack of
//! flow frames.  Steps execute strictly sequentially per request:
//!
//! - `Proceed` advances to the next step of the innermost frame; an
//!   exhausted child frame resumes its parent at the step after the
//!   invoking one; an exhausted root frame completes the assembly.
//! - `Fail` aborts every frame immediately — no sibling or parent step
//!   after the failure point runs — and the fault is recorded on the
//!   context under `error`.
//! - `Invoke` pushes the nested assembly as a new frame (cooperative
//!   recursion, not a separate task).
//!
//! Whatever the outcome, the engine raises the `post-flow` lifecycle event
//! exactly once after the assembly is done, so response-shaping observers
//! run on the error path too.

use crate::params;
use flowgate_kernel::{Assembly, AssemblyStep, Context, POST_FLOW, PolicyFault, PolicyRegistry};
use serde_json::json;
use tracing::{debug, warn};

/// One suspended flow: its steps and the index of the next step to run.
struct Frame {
    steps: Vec<AssemblyStep>,
    next: usize,
}

impl Frame {
    fn new(assembly: &Assembly) -> Self {
        Self {
            steps: assembly.steps.clone(),
            next: 0,
        }
    }
}

/// Executes assemblies against a per-request context.
pub struct AssemblyEngine<'a> {
    registry: &'a dyn PolicyRegistry,
}

impl<'a> AssemblyEngine<'a> {
    pub fn new(registry: &'a dyn PolicyRegistry) -> Self {
        Self { registry }
    }

    /// Run `assembly` to completion.
    ///
    /// Returns the fault that aborted the flow, if any.  The `post-flow`
    /// event fires exactly once in either case.
    pub async fn run(&self, assembly: &Assembly, ctx: &mut Context) -> Result<(), PolicyFault> {
        let result = self.drive(assembly, ctx).await;
        if let Err(fault) = &result {
            ctx.set(
                "error",
                json!({
                    "name": fault.name,
                    "message": fault.message,
                    "status": { "code": fault.status },
                }),
            );
        }
        ctx.notify(POST_FLOW);
        result
    }

    async fn drive(&self, assembly: &Assembly, ctx: &mut Context) -> Result<(), PolicyFault> {
        let mut stack = vec![Frame::new(assembly)];

        while let Some(frame) = stack.last_mut() {
            if frame.next >= frame.steps.len() {
                // End of this flow: resume the parent (or finish).
                stack.pop();
                continue;
            }
            let step = frame.steps[frame.next].clone();
            frame.next += 1;

            let Some(policy) = self.registry.lookup(&step.policy) else {
                warn!(policy = %step.policy, "assembly references unknown policy");
                return Err(PolicyFault::new(
                    "PolicyNotFound",
                    format!("no policy named '{}' is registered", step.policy),
                    500,
                ));
            };

            let props = params::resolve(&step.properties, ctx);
            debug!(policy = %step.policy, depth = stack.len(), "executing policy step");

            match policy.execute(&props, ctx).await {
                flowgate_kernel::PolicyOutcome::Proceed => {}
                flowgate_kernel::PolicyOutcome::Fail(fault) => {
                    debug!(policy = %step.policy, fault = %fault, "assembly aborted");
                    return Err(fault);
                }
                flowgate_kernel::PolicyOutcome::Invoke(sub) => {
                    stack.push(Frame::new(&sub));
                }
            }
        }
        Ok(())
    }
}

// =============================================================================
// Tests
// =============================================================================
