mod common;

mod bounded {
    mod basic;
    mod failures;
}

mod exhaustive {
    mod basic;
    mod failures;
}
