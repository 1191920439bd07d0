pub mod splitting_examples;
mod splitting_examples_tests;
