use rand::Rng;
use rofflang_stdlib::output;
use rofflang_stdlib::StdLibState;
use std::io::Write;
use std::process::Command;
use std::process::Stdio;

pub fn run_in_roffcraft(input: &str) {
    let mut vm = StdLibState::new_vm();
    vm.terminal_out = std::rc::Rc::new(std::cell::RefCell::new(std::io::sink()));
    vm.push_source("", input).unwrap();
    output::run(&mut vm).unwrap();
}

pub fn host_has_groff() -> bool {
    Command::new("which")
        .arg("groff")
        .stdout(Stdio::null())
        .spawn()
        .expect("`which groff` command failed to start")
        .wait()
        .expect("failed to run `which groff`")
        .success()
}

pub fn run_in_groff(input: &str) {
    let mut child = Command::new("groff")
        .arg("-Z")
        .stdin(Stdio::piped())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .expect("groff command failed to start");
    let child_stdin = child.stdin.as_mut().unwrap();
    child_stdin
        .write_all(input.as_bytes())
        .expect("failed to write to groff");
    child.wait().expect("Failed to run groff");
}

use rand::prelude::Distribution;

static RANDOM_REQUEST_NAMES: [&str; 14] = [
    "ds", "as", "nr", "rr", "rm", "als", "if", "ie", "el", "tm", "length", "substring", "chop",
    "shift",
];

pub struct Weights {
    pub argument: u32,
    pub register: u32,
    pub string: u32,
    pub space: u32,
    pub comment: u32,
    pub letter: u32,
    pub other: u32,
    pub request: u32,
}

impl Default for Weights {
    fn default() -> Self {
        Self {
            argument: 20,
            register: 20,
            string: 10,
            space: 20,
            comment: 5,
            letter: 200,
            other: 100,
            request: 20,
        }
    }
}

pub fn generate_random_roff_document(
    rng: &mut rand::prelude::StdRng,
    num_lines: usize,
    macro_length_bounds: (usize, usize),
    line_length_bounds: (usize, usize),
    weights: &Weights,
) -> String {
    let mut result = String::new();
    result.push_str(
        ".\\\" This roff document was randomly generated by a program of the Roffcraft project.\n",
    );
    result.push_str(".\\\" Running the document is a no-op except that .m will be defined at the end.\n");

    // 2 lines of comments are always included
    let mut num_lines_generated: usize = 2;
    loop {
        let (low, high) = if macro_length_bounds.1 < macro_length_bounds.0 {
            (macro_length_bounds.1, macro_length_bounds.1)
        } else {
            macro_length_bounds
        };
        // Each macro takes 2 more lines for the .de line and the terminator.
        if num_lines_generated + low + 2 > num_lines {
            break;
        }
        let high = high.min(num_lines - num_lines_generated - 2);
        let macro_length = rng.gen_range(low..high + 1);
        result.push_str(&generate_random_roff_macro(
            rng,
            line_length_bounds,
            macro_length,
            weights,
        ));
        num_lines_generated += macro_length + 2;
    }
    result
}

pub fn generate_random_roff_macro(
    rng: &mut rand::prelude::StdRng,
    line_length_bounds: (usize, usize),
    num_lines: usize,
    weights: &Weights,
) -> String {
    let dist = rand::distributions::WeightedIndex::new([
        weights.argument,
        weights.register,
        weights.string,
        weights.space,
        weights.comment,
        weights.letter,
        weights.other,
        weights.request,
    ])
    .unwrap();

    let mut result = String::with_capacity(num_lines * line_length_bounds.1 + 100);
    result.push_str(".de m\n");
    for _ in 0..num_lines {
        let line_length = if line_length_bounds.1 <= line_length_bounds.0 {
            line_length_bounds.1
        } else {
            rng.gen_range(line_length_bounds.0..line_length_bounds.1 + 1)
        };
        // Lines that start with a control character are requests, everything else is text.
        let mut i = 0;
        if rng.gen_range(0..4) == 0 {
            let s = format![
                ".{} ",
                RANDOM_REQUEST_NAMES[rng.gen_range(0..RANDOM_REQUEST_NAMES.len())]
            ];
            i += s.len();
            result.push_str(&s);
        } else {
            result.push('x');
            i += 1;
        }
        while i < line_length {
            let temp;
            let s = match dist.sample(rng) {
                0 => match rng.gen_range(0..4) {
                    0 => "\\\\$1",
                    1 => "\\\\$2",
                    2 => "\\\\$*",
                    _ => "\\\\n[.$]",
                },
                1 => match rng.gen_range(0..3) {
                    0 => "\\\\n[a]",
                    1 => "\\\\n+[b]",
                    _ => "\\\\n(.c",
                },
                2 => match rng.gen_range(0..2) {
                    0 => "\\\\*[s]",
                    _ => "\\\\*[t a b]",
                },
                3 => " ",
                4 => {
                    i = line_length;
                    "\\\" comment"
                }
                5 => {
                    let ascii_offset = match rng.gen_range(0..4) {
                        0 => 65, // uppercase
                        _ => 97, // lowercase
                    };
                    temp = char::from_u32(ascii_offset + rng.gen_range(0..26))
                        .unwrap()
                        .to_string();
                    &temp
                }
                6 => match rng.gen_range(0..14) {
                    0 => "0",
                    1 => "1",
                    2 => "2",
                    3 => "3",
                    4 => "4",
                    5 => "5",
                    6 => "6",
                    7 => "7",
                    8 => "8",
                    9 => "9",
                    10 => ".",
                    11 => ",",
                    12 => ";",
                    _ => ":",
                },
                _ => "\\\\{\\\\}",
            };
            i += s.len();
            result.push_str(s);
        }
        result.push('\n');
    }
    result.push_str("..\n");
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    #[test]
    fn random_document_runs() {
        let mut rng = rand::prelude::StdRng::seed_from_u64(43);
        let input =
            generate_random_roff_document(&mut rng, 200, (5, 20), (20, 60), &Default::default());
        assert!(input.lines().count() <= 200);
        run_in_roffcraft(&input);
    }
}
