use std::path::{Path, PathBuf};
use std::sync::Arc;

use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use installment_flow::csv::Action;
use installment_flow::model::DocumentSlot;
use installment_flow::testing::FakeBackend;
use installment_flow::workflow::CalculationPrompt;
use installment_flow::{
    Amount, Config, Driver, FinancingMethod, Session, SimulatedGateway, Workflow,
};
use tokio::runtime::Runtime;

const CARD_FIELDS: [(&str, &str); 7] = [
    ("card_number", "4111111111111111"),
    ("card_holder", "NGUYEN VAN A"),
    ("expiry_date", "12/28"),
    ("cvv", "123"),
    ("bank", "VCB"),
    ("address", "1 Le Loi, District 1"),
    ("phone", "0900000000"),
];

const FINANCE_FIELDS: [(&str, &str); 5] = [
    ("full_name", "Nguyen Van A"),
    ("id_number", "079123456789"),
    ("phone", "0900000000"),
    ("address", "1 Le Loi, District 1"),
    ("monthly_income", "15000000"),
];

/// Generates complete workflow scripts, alternating card and finance plans
/// and cycling through every term.
pub struct ScriptGenerator {
    remaining: u32,
    current: u32,
}

impl ScriptGenerator {
    pub fn new(workflows: u32) -> Self {
        Self {
            remaining: workflows,
            current: 0,
        }
    }

    fn set(field: &str, value: &str) -> Action {
        Action::Set {
            field: field.to_string(),
            value: value.to_string(),
        }
    }

    /// Actions for the next workflow, or `None` once all were produced.
    pub fn next_script(&mut self) -> Option<Vec<Action>> {
        if self.remaining == 0 {
            return None;
        }
        self.remaining -= 1;
        let n = self.current;
        self.current += 1;

        let terms = [3, 6, 9, 12, 18, 24];
        let mut script = vec![
            Action::Open {
                product_id: "p1".into(),
                variant_id: (n % 3 == 0).then(|| "v1".to_string()),
            },
            Action::Term(terms[n as usize % terms.len()]),
            Action::DownPayment(Amount::from_whole(1_000_000 * (n % 5) as i64)),
        ];

        if n % 2 == 0 {
            script.extend(CARD_FIELDS.iter().map(|(f, v)| Self::set(f, v)));
            script.extend([Action::Calculate, Action::Authorize, Action::Submit]);
        } else {
            script.push(Action::Method(FinancingMethod::FinanceCompany));
            script.extend(FINANCE_FIELDS.iter().map(|(f, v)| Self::set(f, v)));
            script.extend(DocumentSlot::ALL.into_iter().map(|slot| Action::Upload {
                slot,
                path: PathBuf::from(format!("{slot}.jpg")),
            }));
            script.extend([Action::Calculate, Action::Acknowledge, Action::Submit]);
        }
        Some(script)
    }
}

async fn run_scripts(documents: &Path, workflows: u32) -> usize {
    let backend = Arc::new(FakeBackend::new());
    let mut driver = Driver::new(backend.clone(), Arc::new(SimulatedGateway), Config::default())
        .with_base_dir(documents);
    let mut generator = ScriptGenerator::new(workflows);
    while let Some(script) = generator.next_script() {
        for action in script {
            let _ = black_box(driver.apply(action).await);
        }
    }
    backend.orders().len()
}

async fn finance_with_documents() -> Workflow {
    let backend = Arc::new(FakeBackend::new());
    let mut workflow = Workflow::open(
        backend,
        Arc::new(SimulatedGateway),
        Session::anonymous(),
        "p1",
        None,
        FinancingMethod::FinanceCompany,
    )
    .await
    .unwrap();

    for (field, value) in FINANCE_FIELDS {
        workflow.set_applicant_field(field, value).unwrap();
    }
    for slot in DocumentSlot::ALL {
        let file = installment_flow::api::Upload::new(format!("{slot}.jpg"), vec![0; 1024]);
        workflow.upload_document(slot, file).await.unwrap();
    }
    assert_eq!(
        workflow.request_calculation().unwrap(),
        CalculationPrompt::Ready
    );
    workflow.calculate().await.unwrap();
    workflow.acknowledge().unwrap();
    workflow.submit().await.unwrap();
    workflow
}

fn bench_scripts(c: &mut Criterion) {
    let runtime = Runtime::new().unwrap();
    let documents = tempfile::tempdir().unwrap();
    for slot in DocumentSlot::ALL {
        std::fs::write(documents.path().join(format!("{slot}.jpg")), [0u8; 1024])
            .unwrap();
    }

    let mut group = c.benchmark_group("scripts");

    for count in [10u32, 100, 1_000] {
        group.bench_with_input(BenchmarkId::from_parameter(count), &count, |b, &count| {
            b.to_async(&runtime)
                .iter(|| run_scripts(documents.path(), count));
        });
    }

    group.finish();
}

fn bench_finance_documents(c: &mut Criterion) {
    let runtime = Runtime::new().unwrap();

    c.bench_function("finance_with_documents", |b| {
        b.to_async(&runtime).iter(finance_with_documents);
    });
}

criterion_group!(benches, bench_scripts, bench_finance_documents);
criterion_main!(benches);
