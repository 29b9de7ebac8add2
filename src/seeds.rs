//! Built-in curriculum used when no TOML config provides one.

use crate::config::{QuestionCfg, TopicCfg};

/// Small Python course that keeps the app useful without external config.
pub fn seed_topics() -> Vec<TopicCfg> {
  vec![
    TopicCfg {
      id: 1,
      title: "Getting Started".into(),
      description: "Printing values and basic arithmetic.".into(),
      theory: "`print()` writes its arguments to standard output, separated by spaces and followed by a newline.".into(),
      order: 1,
      questions: vec![
        QuestionCfg {
          id: 1,
          title: "Hello, World".into(),
          description: "Print the text Hello, World!".into(),
          expected_output: "Hello, World!".into(),
          order: 1,
          required_keywords: "print".into(),
          hint: "Use the print() function.".into(),
        },
        QuestionCfg {
          id: 2,
          title: "Simple Sum".into(),
          description: "Store 7 and 5 in two variables and print their sum.".into(),
          expected_output: "12".into(),
          order: 2,
          required_keywords: "print,+".into(),
          hint: "Add the two variables with + inside print().".into(),
        },
      ],
    },
    TopicCfg {
      id: 2,
      title: "Loops".into(),
      description: "Repeating work with for loops.".into(),
      theory: "`for i in range(a, b):` runs its body once for each integer from a up to (not including) b.".into(),
      order: 2,
      questions: vec![
        QuestionCfg {
          id: 3,
          title: "Count to Five".into(),
          description: "Print the numbers 1 to 5, one per line.".into(),
          expected_output: "1\n2\n3\n4\n5".into(),
          order: 1,
          required_keywords: "for,range".into(),
          hint: "Use a for loop over range(1, 6).".into(),
        },
      ],
    },
    TopicCfg {
      id: 3,
      title: "Functions".into(),
      description: "Defining and calling your own functions.".into(),
      theory: "`def name(args):` defines a function; `return` hands a value back to the caller.".into(),
      order: 3,
      questions: vec![
        QuestionCfg {
          id: 4,
          title: "Greeting".into(),
          description: "Write greet(name) returning \"Hello, <name>!\" and print greet(\"Ada\").".into(),
          expected_output: "Hello, Ada!".into(),
          order: 1,
          required_keywords: "def,return".into(),
          hint: "Define the function with def and build the string with an f-string.".into(),
        },
      ],
    },
  ]
}
