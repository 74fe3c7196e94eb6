use crate::ast::{CheckerOutput, CompilationUnit};
use std::sync::OnceLock;

const SAMPLE_SOURCE: &str = "module Nat
module Eq = org.sasylf.util.Equality

terminals z s

syntax

n ::= z
    | s n

1 := s z

judgment plus: n + n = n

------------ plus-z
z + n = n

n1 + n2 = n3
---------------- plus-s
s n1 + n2 = s n3

theorem plus-total: forall n1 forall n2 exists n1 + n2 = n3.
proof by unproved
end theorem

lemma plus-z-right: forall n exists n + z = n.
proof by unproved
end lemma

theorem use-eq: forall d: n == n exists n == n.
d2: n == n by rule Eq.eq
end theorem
";

const EQUALITY_SOURCE: &str = "module Equality

terminals

judgment equal: n == n

---------- eq
n == n

theorem eq-symm: forall d: n1 == n2 exists n2 == n1.
proof by unproved
end theorem
";

const SAMPLE_OUTPUT: &str = r#"{
  "quickfixes": [
    {"severity": "warning", "error_message": "theorem use-eq is never used",
     "begin_line": 30, "begin_column": 9, "end_line": 30, "end_column": 15},
    {"severity": "error", "error_type": "THEOREM_KIND_WRONG", "error_info": "lemma\ntheorem",
     "error_message": "plus-z-right should be declared as a theorem",
     "begin_line": 26, "begin_column": 1, "end_line": 26, "end_column": 6},
    {"severity": "info", "error_message": "3 theorems checked",
     "begin_line": 1, "begin_column": 1, "end_line": 1, "end_column": 1}
  ],
  "ast": {
    "name": "Nat",
    "modules": [
      {"name": "Nat: org/sasylf/util/Nat.slf", "file": "org/sasylf/util/Nat.slf",
       "begin_line": 1, "begin_column": 1, "end_line": 1, "end_column": 11},
      {"name": "Eq: org/sasylf/util/Equality.slf", "file": "org/sasylf/util/Equality.slf",
       "begin_line": 2, "begin_column": 1, "end_line": 2, "end_column": 37,
       "text": EQUALITY_TEXT,
       "ast": {
         "name": "Equality",
         "theorems": [
           {"name": "eq-symm", "line": 10, "column": 9, "kind": "theorem",
            "foralls": ["d: n1 == n2"], "conclusion": "n2 == n1"}
         ],
         "judgments": [
           {"name": "equal", "line": 5, "column": 10, "form": "n == n",
            "rules": [{"name": "eq", "premises": [], "conclusion": "n == n",
                       "in_file": true, "line": 7, "column": 12,
                       "file": "org/sasylf/util/Equality.slf"}]}
         ]
       }}
    ],
    "syntax": {
      "syntax_declarations": [
        {"name": "n", "line": 8, "column": 1,
         "clauses": [{"name": "z", "line": 8, "column": 7}, {"name": "s n", "line": 9, "column": 7}]}
      ],
      "sugars": [{"name": "1 := s z\n", "line": 11, "column": 1}]
    },
    "theorems": [
      {"name": "plus-total", "line": 22, "column": 9, "kind": "theorem",
       "foralls": ["n1", "n2"], "conclusion": "n1 + n2 = n3"},
      {"name": "plus-z-right", "line": 26, "column": 7, "kind": "lemma",
       "foralls": ["n"], "conclusion": "n + z = n"},
      {"name": "use-eq", "line": 30, "column": 9, "kind": "theorem",
       "foralls": ["d: n == n"], "conclusion": "n == n"}
    ],
    "judgments": [
      {"name": "plus", "line": 13, "column": 10, "form": "n + n = n",
       "rules": [
         {"name": "plus-z", "premises": [], "conclusion": "z + n = n",
          "in_file": true, "line": 15, "column": 14, "file": "org/sasylf/util/Nat.slf"},
         {"name": "plus-s", "premises": ["n1 + n2 = n3"], "conclusion": "s n1 + n2 = s n3",
          "in_file": true, "line": 19, "column": 18, "file": "org/sasylf/util/Nat.slf"}
       ]},
      {"name": "equal", "line": 5, "column": 10, "form": "n == n",
       "rules": [
         {"name": "eq", "premises": [], "conclusion": "n == n",
          "in_file": false, "line": 7, "column": 12, "file": "org/sasylf/util/Equality.slf"}
       ]}
    ]
  }
}"#;

struct SampleFixture {
    output_json: String,
    output: CheckerOutput,
}

static SAMPLE_FIXTURE: OnceLock<SampleFixture> = OnceLock::new();

fn sample_fixture() -> &'static SampleFixture {
    SAMPLE_FIXTURE.get_or_init(|| {
        let text = serde_json::to_string(EQUALITY_SOURCE)
            .expect("failed to encode equality fixture source");
        let output_json = SAMPLE_OUTPUT.replace("EQUALITY_TEXT", &text);
        let output = CheckerOutput::from_json(&output_json)
            .expect("failed to decode checker fixture for sasylf tests");
        SampleFixture {
            output_json,
            output,
        }
    })
}

/// Source of the `Nat` sample proof file.
pub fn sample_source() -> &'static str {
    SAMPLE_SOURCE
}

/// Source of the imported `Equality` module.
pub fn equality_source() -> &'static str {
    EQUALITY_SOURCE
}

/// Raw checker stdout for [`sample_source`].
pub fn sample_output_json() -> &'static str {
    sample_fixture().output_json.as_str()
}

pub fn sample_output() -> CheckerOutput {
    sample_fixture().output.clone()
}

pub fn sample_unit() -> CompilationUnit {
    sample_fixture().output.ast.clone()
}
