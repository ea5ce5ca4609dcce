pub struct CaseResult {
    pub name: &'static str,
    pub error: Option<String>,
}

impl CaseResult {
    pub fn new(name: &'static str, result: anyhow::Result<()>) -> Self {
        Self {
            name,
            error: result.err().map(|e| e.to_string()),
        }
    }
}

#[derive(Default)]
pub struct Summary {
    pub total: usize,
    pub passed: usize,
}

impl Summary {
    pub fn report(&mut self, label: &str, cases: &[CaseResult]) {
        for case in cases {
            self.total += 1;
            match &case.error {
                None => {
                    println!("  PASS  {label} / {}", case.name);
                    self.passed += 1;
                }
                Some(e) => println!("  FAIL  {label} / {}: {e}", case.name),
            }
        }
    }
}
