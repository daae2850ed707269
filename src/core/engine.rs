use crate::core::generator::MatrixGenerator;
use crate::core::MatrixTransfer;
use crate::domain::model::{
    Matrix, MatrixSize, SessionReport, TransferOutcome, Verification, WordWidth,
};
use crate::utils::error::{Result, UartError};
use crate::utils::monitor::SessionTimer;
use chrono::Utc;

pub struct MatmulEngine<T: MatrixTransfer> {
    transfer: T,
    generator: MatrixGenerator,
    verify: bool,
    timing: bool,
}

impl<T: MatrixTransfer> MatmulEngine<T> {
    pub fn new(transfer: T, generator: MatrixGenerator) -> Self {
        Self {
            transfer,
            generator,
            verify: false,
            timing: false,
        }
    }

    pub fn with_verification(mut self, verify: bool) -> Self {
        self.verify = verify;
        self
    }

    pub fn with_timing(mut self, timing: bool) -> Self {
        self.timing = timing;
        self
    }

    /// 驗證大小、產生隨機矩陣並執行一次 session
    pub async fn run(&self, size: i64) -> Result<SessionReport> {
        let size = MatrixSize::new(size)?;
        let (a, b) = self.generator.generate_pair(size);
        self.run_with(a, b).await
    }

    pub async fn run_with(&self, a: Matrix<u8>, b: Matrix<u8>) -> Result<SessionReport> {
        let size = MatrixSize::new(a.size() as i64)?;
        if b.size() != a.size() {
            return Err(UartError::ConfigValidationError {
                field: "matrix_b".to_string(),
                message: "A and B must have the same size".to_string(),
            });
        }

        let started_at = Utc::now();
        let mut timer = SessionTimer::new(self.timing);
        let width = self.transfer.word_width();

        println!("Starting {}x{} session on {} ({})", size, size, self.transfer.port_name(), width);
        println!("\nMatrix A:\n{}", a);
        println!("\nMatrix B:\n{}", b);
        println!();

        let outcome = self.transfer.transfer(&a, &b, &mut timer).await?;
        timer.log_stats("Session");

        let verification = match &outcome {
            TransferOutcome::Complete { result } => {
                Self::print_result(result, width);
                if self.verify {
                    a.multiply(&b)
                        .map(|reference| Self::report_verification(&reference, result, width))
                } else {
                    None
                }
            }
            TransferOutcome::Partial(partial) => {
                tracing::warn!(
                    "⚠️ Partial response: {} of {} bytes ({}/{} values)",
                    partial.received,
                    partial.expected,
                    partial.received_values(),
                    partial.expected_values()
                );
                println!("{}", partial);
                None
            }
        };

        timer.log_final_stats();

        Ok(SessionReport {
            started_at,
            port: self.transfer.port_name().to_string(),
            size,
            mode: width,
            matrix_a: a,
            matrix_b: b,
            outcome,
            verification,
            timing: timer.report(),
        })
    }

    fn print_result(result: &Matrix<u16>, width: WordWidth) {
        match width {
            WordWidth::Byte => println!("\nResult matrix:\n{}", result),
            WordWidth::Word => {
                println!("\n16-bit result values: {:?}", result.as_slice());
                println!("\nMatrix R (NxN):\n{}", result);
            }
        }
    }

    fn report_verification(
        reference: &Matrix<u32>,
        result: &Matrix<u16>,
        width: WordWidth,
    ) -> Verification {
        let verification = Verification::compare(reference, result, width);
        if verification.matched {
            tracing::info!("✅ Device result matches host reference");
            println!("\n✅ Result verified against host reference");
        } else {
            tracing::warn!(
                "❌ {} cells differ from host reference",
                verification.mismatches.len()
            );
            println!("\n❌ Result differs from host reference:");
            for m in &verification.mismatches {
                println!(
                    "  R[{}][{}]: expected {}, got {}",
                    m.row, m.col, m.expected, m.actual
                );
            }
        }
        verification
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::protocol;
    use crate::domain::model::PartialResult;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// 回放預先準備好的回應位元組
    struct ScriptedTransfer {
        width: WordWidth,
        response: Vec<u8>,
        calls: AtomicUsize,
        sent: Mutex<Vec<u8>>,
    }

    impl ScriptedTransfer {
        fn new(width: WordWidth, response: Vec<u8>) -> Self {
            Self {
                width,
                response,
                calls: AtomicUsize::new(0),
                sent: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl MatrixTransfer for ScriptedTransfer {
        fn port_name(&self) -> &str {
            "scripted"
        }

        fn word_width(&self) -> WordWidth {
            self.width
        }

        async fn transfer(
            &self,
            a: &Matrix<u8>,
            b: &Matrix<u8>,
            _timer: &mut SessionTimer,
        ) -> Result<TransferOutcome> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let size = MatrixSize::new(a.size() as i64)?;
            *self.sent.lock().unwrap() = protocol::encode_request(size, a, b);
            Ok(protocol::assemble_response(size, self.width, self.response.clone()))
        }
    }

    #[tokio::test]
    async fn test_out_of_range_sizes_skip_transfer() {
        let engine = MatmulEngine::new(
            ScriptedTransfer::new(WordWidth::Byte, vec![]),
            MatrixGenerator::new(Some(1)),
        );

        for size in [1, 11, 0, -3] {
            let err = engine.run(size).await.unwrap_err();
            assert!(matches!(err, UartError::InvalidSize { .. }));
        }
        assert_eq!(engine.transfer.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_generated_inputs_are_sent() {
        let engine = MatmulEngine::new(
            ScriptedTransfer::new(WordWidth::Byte, vec![0; 9]),
            MatrixGenerator::new(Some(3)),
        );

        let report = engine.run(3).await.unwrap();

        let sent = engine.transfer.sent.lock().unwrap().clone();
        assert_eq!(sent.len(), 1 + 2 * 9);
        assert_eq!(sent[0], 3);
        assert_eq!(&sent[1..10], report.matrix_a.as_slice());
        assert_eq!(&sent[10..], report.matrix_b.as_slice());
        assert!(report.outcome.is_complete());
    }

    #[tokio::test]
    async fn test_verification_in_word_mode() {
        let a = Matrix::from_flat(2, vec![1u8, 2, 3, 4]).unwrap();
        let b = Matrix::from_flat(2, vec![5u8, 6, 7, 8]).unwrap();
        // 19, 22, 43, 50
        let response = vec![0, 19, 0, 22, 0, 43, 0, 50];
        let engine = MatmulEngine::new(
            ScriptedTransfer::new(WordWidth::Word, response),
            MatrixGenerator::default(),
        )
        .with_verification(true);

        let report = engine.run_with(a, b).await.unwrap();
        assert!(report.verification.unwrap().matched);
    }

    #[tokio::test]
    async fn test_partial_outcome_has_no_verification() {
        let a = Matrix::from_flat(2, vec![1u8, 1, 1, 1]).unwrap();
        let engine = MatmulEngine::new(
            ScriptedTransfer::new(WordWidth::Byte, vec![2, 2, 2]),
            MatrixGenerator::default(),
        )
        .with_verification(true);

        let report = engine.run_with(a.clone(), a).await.unwrap();
        assert_eq!(
            report.outcome,
            TransferOutcome::Partial(PartialResult {
                width: WordWidth::Byte,
                received: 3,
                expected: 4,
                bytes: vec![2, 2, 2],
            })
        );
        assert!(report.verification.is_none());
    }
}
