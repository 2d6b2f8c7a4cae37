use smelt_graph::TypeRef;

use crate::result::{FailedResolution, MethodResolutionResult, MultipleResolutions, SingleResolution};

/// Accumulates the resolution outcomes found across duplicate definitions of
/// a type and collapses them into the canonical result.
#[derive(Default)]
pub struct ResolutionResultBuilder<'a> {
    results: Vec<MethodResolutionResult<'a>>,
    allow_multiple_program_results: bool,
}

impl<'a> ResolutionResultBuilder<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn allow_multiple_program_results(mut self) -> Self {
        self.allow_multiple_program_results = true;
        self
    }

    pub fn add_resolution_result(&mut self, result: MethodResolutionResult<'a>) {
        self.results.push(result);
    }

    /// Collapse into a result, or `None` when nothing was accumulated.
    pub fn build(self) -> Option<MethodResolutionResult<'a>> {
        if self.results.is_empty() {
            return None;
        }
        Some(self.build_nonempty(&[]))
    }

    /// Collapse into a result, or `empty_result` when nothing was
    /// accumulated. `responsible_types` records which types caused a
    /// NoSuchMethod outcome alongside a successful one, so the error can be
    /// reproduced faithfully later.
    pub fn build_or_if_empty(
        self,
        empty_result: MethodResolutionResult<'a>,
        responsible_types: &[TypeRef],
    ) -> MethodResolutionResult<'a> {
        if self.results.is_empty() {
            return empty_result;
        }
        self.build_nonempty(responsible_types)
    }

    fn build_nonempty(mut self, responsible_types: &[TypeRef]) -> MethodResolutionResult<'a> {
        if self.results.len() == 1 {
            return self.results.pop().expect("one result");
        }

        let mut program_or_classpath: Vec<SingleResolution<'a>> = Vec::new();
        let mut library: Vec<SingleResolution<'a>> = Vec::new();
        let mut failed: Vec<FailedResolution<'a>> = Vec::new();
        let mut no_such_types: Vec<TypeRef> = Vec::new();
        let mut saw_no_such_method = false;

        for result in self.results {
            visit(
                result,
                &mut program_or_classpath,
                &mut library,
                &mut failed,
                &mut no_such_types,
                &mut saw_no_such_method,
            );
        }
        debug_assert!(
            self.allow_multiple_program_results || program_or_classpath.len() <= 1,
            "unexpected multiple results between program and classpath"
        );

        // A NoSuchMethod seen next to a successful result means the type has
        // several definitions; fold every cause into one failure that keeps
        // all responsible types.
        if saw_no_such_method {
            if !program_or_classpath.is_empty() || !library.is_empty() {
                let mut types_causing_error = responsible_types.to_vec();
                for ty in no_such_types {
                    if !types_causing_error.contains(&ty) {
                        types_causing_error.push(ty);
                    }
                }
                failed.push(FailedResolution::NoSuchMethod {
                    types_causing_error,
                    due_to_multiple_definitions: true,
                });
            } else {
                failed.push(FailedResolution::no_such_method());
            }
        }

        if program_or_classpath.is_empty() {
            if library.len() == 1 && failed.is_empty() {
                return MethodResolutionResult::Single(library.remove(0));
            }
            if library.is_empty() && failed.len() == 1 {
                return MethodResolutionResult::Failed(failed.remove(0));
            }
        } else if program_or_classpath.len() == 1 && library.is_empty() && failed.is_empty() {
            return MethodResolutionResult::Single(program_or_classpath.remove(0));
        }
        MethodResolutionResult::Multiple(MultipleResolutions {
            program_or_classpath,
            library,
            failed,
        })
    }
}

fn visit<'a>(
    result: MethodResolutionResult<'a>,
    program_or_classpath: &mut Vec<SingleResolution<'a>>,
    library: &mut Vec<SingleResolution<'a>>,
    failed: &mut Vec<FailedResolution<'a>>,
    no_such_types: &mut Vec<TypeRef>,
    saw_no_such_method: &mut bool,
) {
    match result {
        MethodResolutionResult::Unknown => {
            debug_assert!(false, "unknown result cannot be combined");
        }
        MethodResolutionResult::Single(single) => {
            if single.resolved_holder().is_library_class() {
                let duplicate = library
                    .iter()
                    .any(|existing| std::ptr::eq(existing.resolved_holder(), single.resolved_holder()));
                if !duplicate {
                    library.push(single);
                }
            } else {
                program_or_classpath.push(single);
            }
        }
        MethodResolutionResult::Multiple(multiple) => {
            for single in multiple.program_or_classpath {
                program_or_classpath.push(single);
            }
            for single in multiple.library {
                let duplicate = library
                    .iter()
                    .any(|existing| std::ptr::eq(existing.resolved_holder(), single.resolved_holder()));
                if !duplicate {
                    library.push(single);
                }
            }
            for failure in multiple.failed {
                visit_failed(failure, failed, no_such_types, saw_no_such_method);
            }
        }
        // Array clone results do not combine with anything.
        MethodResolutionResult::ArrayClone => {}
        MethodResolutionResult::Failed(failure) => {
            visit_failed(failure, failed, no_such_types, saw_no_such_method);
        }
    }
}

fn visit_failed<'a>(
    failure: FailedResolution<'a>,
    failed: &mut Vec<FailedResolution<'a>>,
    no_such_types: &mut Vec<TypeRef>,
    saw_no_such_method: &mut bool,
) {
    if let FailedResolution::NoSuchMethod {
        types_causing_error,
        ..
    } = failure
    {
        // Deferred: merged into a single NoSuchMethod result once every
        // candidate has been seen.
        *saw_no_such_method = true;
        no_such_types.extend(types_causing_error);
    } else {
        failed.push(failure);
    }
}
