use criterion::{black_box, criterion_group, criterion_main, Criterion};
use libforth::{Cell, Config, VM};
use std::io;

fn new_vm() -> VM<'static> {
    VM::new(Config::default(), io::empty(), io::sink()).unwrap()
}

fn bench_noop(c: &mut Criterion) {
    let vm = &mut new_vm();
    c.bench_function("noop", |b| b.iter(|| vm.noop()));
}

fn bench_find_word_not_exist(c: &mut Criterion) {
    let vm = &mut new_vm();
    c.bench_function("find word not exist", |b| b.iter(|| vm.find(b"unknown")));
}

fn bench_find_word_at_end_of_wordlist(c: &mut Criterion) {
    let vm = &mut new_vm();
    c.bench_function("find word at end of wordlist", |b| {
        b.iter(|| vm.find(b"exit"))
    });
}

fn bench_inner_interpreter_without_nest(c: &mut Criterion) {
    let vm = &mut new_vm();
    vm.evaluate(": seven-noops cells cells cells cells cells cells cells ;")
        .unwrap();
    let xt = vm.find(b"seven-noops").unwrap().unwrap().xt() as Cell;
    c.bench_function("inner interpreter without nest", |b| {
        b.iter(|| {
            vm.execute_word(xt).unwrap();
            vm.run_inner().unwrap();
        })
    });
}

fn bench_drop(c: &mut Criterion) {
    let vm = &mut new_vm();
    c.bench_function("drop", |b| {
        b.iter(|| {
            vm.s_stack().push(1).unwrap();
            vm.p_drop().unwrap();
        })
    });
}

fn bench_swap(c: &mut Criterion) {
    let vm = &mut new_vm();
    vm.evaluate("1 2").unwrap();
    c.bench_function("swap", |b| b.iter(|| vm.swap()));
}

fn bench_rot(c: &mut Criterion) {
    let vm = &mut new_vm();
    vm.evaluate("1 2 3").unwrap();
    c.bench_function("rot", |b| b.iter(|| vm.rot()));
}

fn bench_2dup(c: &mut Criterion) {
    let vm = &mut new_vm();
    vm.evaluate("1 2").unwrap();
    c.bench_function("2dup", |b| {
        b.iter(|| {
            vm.two_dup().unwrap();
            vm.two_drop().unwrap();
        })
    });
}

fn bench_plus(c: &mut Criterion) {
    let vm = &mut new_vm();
    vm.s_stack().push(1).unwrap();
    c.bench_function("plus", |b| {
        b.iter(|| {
            vm.dup().unwrap();
            vm.plus().unwrap();
        })
    });
}

fn bench_slash(c: &mut Criterion) {
    let vm = &mut new_vm();
    vm.s_stack().push(30000).unwrap();
    c.bench_function("slash", |b| {
        b.iter(|| {
            vm.s_stack().push(3).unwrap();
            vm.slash().unwrap();
            vm.s_stack().set(0, 30000).unwrap();
        })
    });
}

fn bench_compile_square(c: &mut Criterion) {
    c.bench_function("compile square", |b| {
        b.iter(|| {
            let vm = &mut new_vm();
            vm.evaluate(black_box(": square dup * ;")).unwrap();
        })
    });
}

fn bench_fib(c: &mut Criterion) {
    let vm = &mut new_vm();
    vm.evaluate(": fib dup 2 < if exit then 1- dup recurse swap 1- recurse + ;")
        .unwrap();
    let xt = vm.find(b"fib").unwrap().unwrap().xt() as Cell;
    c.bench_function("fib 15", |b| {
        b.iter(|| {
            vm.s_stack().push(black_box(15)).unwrap();
            vm.execute_word(xt).unwrap();
            vm.run_inner().unwrap();
            vm.p_drop().unwrap();
        })
    });
}

fn bench_count_loop(c: &mut Criterion) {
    let vm = &mut new_vm();
    vm.evaluate(": count 0 1000 0 do i + loop drop ;").unwrap();
    let xt = vm.find(b"count").unwrap().unwrap().xt() as Cell;
    c.bench_function("do loop 1000", |b| {
        b.iter(|| {
            vm.execute_word(xt).unwrap();
            vm.run_inner().unwrap();
        })
    });
}

criterion_group!(
    benches,
    bench_noop,
    bench_find_word_not_exist,
    bench_find_word_at_end_of_wordlist,
    bench_inner_interpreter_without_nest,
    bench_drop,
    bench_swap,
    bench_rot,
    bench_2dup,
    bench_plus,
    bench_slash,
    bench_compile_square,
    bench_fib,
    bench_count_loop
);
criterion_main!(benches);
