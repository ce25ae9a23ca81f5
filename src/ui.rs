//! Interface de terminal do acp-skill: spinner e saída colorida em stderr.
//!
//! Usa `indicatif` para o spinner e `console` para as cores. O [`JobProgress`]
//! acompanha um job enquanto o driver faz polling; stdout fica reservado para
//! a linha JSON de resultado.

use std::time::Duration;

use console::{Style, Term};
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};

use crate::acp::JobPhase;
use crate::orchestrator::JobObserver;

/// Indicador visual de progresso para um job em execução.
pub struct JobProgress {
    pb: ProgressBar,
    // Verde para pagamentos e conclusão.
    green: Style,
    // Ciano para mudanças de fase.
    cyan: Style,
}

impl JobProgress {
    /// Inicia o spinner apenas se stderr for um terminal.
    pub fn for_stderr() -> Option<Self> {
        Term::stderr()
            .is_term()
            .then(|| Self::start(ProgressDrawTarget::stderr()))
    }

    fn start(target: ProgressDrawTarget) -> Self {
        let pb = ProgressBar::with_draw_target(None, target);
        if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.cyan} {msg} [{elapsed}]") {
            pb.set_style(style);
        }
        pb.set_message("submitting job");
        pb.enable_steady_tick(Duration::from_millis(100));

        Self {
            pb,
            green: Style::new().green().bold(),
            cyan: Style::new().cyan(),
        }
    }

    /// Encerra o spinner sem deixar rastro no terminal.
    pub fn finish(&self) {
        self.pb.finish_and_clear();
    }
}

impl JobObserver for JobProgress {
    fn job_created(&mut self, job_id: &str) {
        self.pb.set_message(format!("job {job_id}: waiting for provider"));
    }

    fn phase_changed(&mut self, phase: JobPhase) {
        self.pb
            .set_message(format!("phase {}", self.cyan.apply_to(phase)));
        if phase == JobPhase::Completed {
            self.pb
                .println(format!("  {} job completed", self.green.apply_to("✓")));
        }
    }

    fn payment_sent(&mut self, job_id: &str) {
        self.pb.println(format!(
            "  {} accepted requirement and paid for job {job_id}",
            self.green.apply_to("$")
        ));
    }
}

impl Drop for JobProgress {
    fn drop(&mut self) {
        self.finish();
    }
}
