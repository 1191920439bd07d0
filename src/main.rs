use SplitFlame::Examples::splitting_examples::splitting_examples;
use SplitFlame::Utils::logging::init_logger;
use log::LevelFilter;

pub fn main() {
    init_logger(LevelFilter::Info);
    let task: usize = 0;
    splitting_examples(task);
}
