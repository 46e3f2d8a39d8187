//! Extraction instruction sent with every document.
//!
//! The instruction and the response schema work together: the schema fixes
//! the shape, the instruction pins down what goes *into* it (numbering,
//! the `source` value, how to pick a subject, the expected answer letters).

use crate::schema::Subject;

/// Number of questions a paper is expected to contain.
pub const EXPECTED_QUESTIONS: usize = 50;

/// Build the instruction for one file.
///
/// `file_name` is the base name of the input (e.g. `examA.pdf`) and becomes
/// the required value of every record's `source` field.
pub fn extraction_instruction(file_name: &str) -> String {
    let [process, industry] = Subject::ALL;
    format!(
        "This PDF is a past exam paper containing {n} multiple-choice questions. \
Parse the document strictly and convert every question, including its options and \
correct answer, into the JSON format defined by the response schema. Emit exactly \
the fields of the schema and nothing else.\n\
- 'number' must be the question's sequence number, an integer from 1 to {n}.\n\
- 'source' must always be exactly '{file_name}'.\n\
- 'subject' must be '{process}' for manufacturing-process questions or \
'{industry}' for industry-overview questions, judged from the question content.\n\
- Copy question and option text verbatim, in the document's original language.\n\
- Make sure the output contains {n} questions in total and every answer is one of \
A, B, C or D.",
        n = EXPECTED_QUESTIONS,
    )
}
